// Scene module: ordered object arena and render dispatch

use crate::{
    device::GraphicsDevice,
    objects::{ObjectKind, RenderContext, Renderable, SceneObject},
};

/// Handle to an object owned by a [`Scene`]. Never reused within a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

/// Represents the entire 3D scene.
///
/// Objects render in the order they were created; there is no depth sorting.
#[derive(Debug, Default)]
pub struct Scene {
    objects: Vec<(ObjectId, SceneObject)>,
    next_id: u64,
}

impl Scene {
    /// Creates a new, empty scene.
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            next_id: 0,
        }
    }

    /// Builds an object of the given kind and appends it to the render order.
    pub fn create_object(&mut self, kind: ObjectKind, device: &mut dyn GraphicsDevice) -> ObjectId {
        self.add_object(SceneObject::new(kind, device))
    }

    /// Like [`Scene::create_object`], keyed on a textual tag such as `"grid"`.
    /// Unknown tags create nothing and return `None`.
    pub fn create_object_by_tag(&mut self, tag: &str, device: &mut dyn GraphicsDevice) -> Option<ObjectId> {
        match tag.parse::<ObjectKind>() {
            Ok(kind) => Some(self.create_object(kind, device)),
            Err(err) => {
                log::warn!("{err}");
                None
            }
        }
    }

    /// Adds an already constructed object to the end of the render order.
    pub fn add_object(&mut self, object: SceneObject) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        log::debug!("scene: added {:?} as {:?}", object.kind(), id);
        self.objects.push((id, object));
        id
    }

    /// Removes the object if it is still in the scene and frees its buffers on
    /// `device`. Removing an unknown id leaves the scene untouched.
    pub fn remove_object(&mut self, id: ObjectId, device: &mut dyn GraphicsDevice) -> Option<ObjectKind> {
        let index = self.objects.iter().position(|(candidate, _)| *candidate == id)?;
        let (_, object) = self.objects.remove(index);
        let kind = object.kind();
        object.release(device);
        log::debug!("scene: removed {:?} ({:?})", id, kind);
        Some(kind)
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects
            .iter()
            .find(|(candidate, _)| *candidate == id)
            .map(|(_, object)| object)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects
            .iter_mut()
            .find(|(candidate, _)| *candidate == id)
            .map(|(_, object)| object)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Ids in render order.
    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.objects.iter().map(|(id, _)| *id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &SceneObject)> {
        self.objects.iter().map(|(id, object)| (*id, object))
    }

    /// Renders every object in insertion order.
    pub fn render(&mut self, delta_time: f32, ctx: &mut RenderContext<'_>) {
        for (_, object) in &mut self.objects {
            object.render(delta_time, ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        camera::{Camera, CameraConfig},
        headless::HeadlessDevice,
    };
    use glam::Vec4;

    fn render_colors(scene: &mut Scene, device: &mut HeadlessDevice) -> Vec<Vec4> {
        let camera = Camera::new(&CameraConfig::default(), (800, 600));
        device.take_commands();
        scene.render(0.016, &mut RenderContext { device: &mut *device, camera: &camera });
        device.draws().map(|draw| draw.color).collect()
    }

    fn red() -> Vec4 {
        Vec4::new(1.0, 0.0, 0.0, 1.0)
    }

    fn green() -> Vec4 {
        Vec4::new(0.0, 1.0, 0.0, 1.0)
    }

    fn blue() -> Vec4 {
        Vec4::new(0.0, 0.0, 1.0, 1.0)
    }

    fn three_colored(scene: &mut Scene, device: &mut HeadlessDevice) -> [ObjectId; 3] {
        let ids = [
            scene.create_object(ObjectKind::Plane, device),
            scene.create_object(ObjectKind::Mesh, device),
            scene.create_object(ObjectKind::Grid, device),
        ];
        for (id, color) in ids.iter().zip([red(), green(), blue()]) {
            scene.get_mut(*id).expect("created").set_color(color);
        }
        ids
    }

    #[test]
    fn objects_render_in_creation_order() {
        let mut device = HeadlessDevice::new(800, 600);
        let mut scene = Scene::new();
        let ids = three_colored(&mut scene, &mut device);

        assert_eq!(scene.ids().collect::<Vec<_>>(), ids.to_vec());
        assert_eq!(render_colors(&mut scene, &mut device), vec![red(), green(), blue()]);
    }

    #[test]
    fn removing_middle_object_keeps_relative_order() {
        let mut device = HeadlessDevice::new(800, 600);
        let mut scene = Scene::new();
        let [first, second, third] = three_colored(&mut scene, &mut device);

        let removed = scene.remove_object(second, &mut device).expect("present");
        assert_eq!(removed, ObjectKind::Mesh);
        assert_eq!(scene.ids().collect::<Vec<_>>(), vec![first, third]);
        assert_eq!(render_colors(&mut scene, &mut device), vec![red(), blue()]);
    }

    #[test]
    fn removing_absent_object_is_a_no_op() {
        let mut device = HeadlessDevice::new(800, 600);
        let mut scene = Scene::new();
        let [first, second, third] = three_colored(&mut scene, &mut device);

        assert!(scene.remove_object(second, &mut device).is_some());
        let buffers = device.buffer_count();
        assert!(scene.remove_object(second, &mut device).is_none());
        assert!(scene.remove_object(ObjectId(999), &mut device).is_none());
        assert_eq!(device.buffer_count(), buffers);
        assert_eq!(scene.ids().collect::<Vec<_>>(), vec![first, third]);
    }

    #[test]
    fn ids_are_not_reused_after_removal() {
        let mut device = HeadlessDevice::new(800, 600);
        let mut scene = Scene::new();
        let first = scene.create_object(ObjectKind::Grid, &mut device);
        scene.remove_object(first, &mut device);
        let second = scene.create_object(ObjectKind::Grid, &mut device);

        assert_ne!(first, second);
        assert!(scene.get(first).is_none());
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn create_remove_cycles_do_not_grow_device_buffers() {
        let mut device = HeadlessDevice::new(800, 600);
        let mut scene = Scene::new();
        let grid = scene.create_object(ObjectKind::Grid, &mut device);
        let baseline = device.buffer_count();

        for _ in 0..1000 {
            let id = scene.create_object(ObjectKind::Mesh, &mut device);
            assert_eq!(scene.remove_object(id, &mut device), Some(ObjectKind::Mesh));
        }

        assert_eq!(scene.ids().collect::<Vec<_>>(), vec![grid]);
        assert_eq!(device.buffer_count(), baseline);
        assert_eq!(render_colors(&mut scene, &mut device), vec![Vec4::ONE]);
    }

    #[test]
    fn unknown_tag_creates_nothing() {
        let mut device = HeadlessDevice::new(800, 600);
        let mut scene = Scene::new();

        assert!(scene.create_object_by_tag("sprite", &mut device).is_none());
        assert!(scene.is_empty());

        let grid = scene.create_object_by_tag("grid", &mut device).expect("known tag");
        assert_eq!(scene.get(grid).map(SceneObject::kind), Some(ObjectKind::Grid));
    }
}
