//! ECS World wrapper with a parent/child scene hierarchy

use glam::Mat4;
pub use hecs::DynamicBundle;
use hecs::{Component, Entity, World as HecsWorld};

use crate::components::*;

/// Spawned entity handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityHandle(pub Entity);

/// Link from a child to its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parent(pub Entity);

/// Ordered child list of an entity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Children(pub Vec<Entity>);

/// ECS World wrapper with convenience methods
#[derive(Default)]
pub struct EngineWorld {
    world: HecsWorld,
}

impl EngineWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn an entity with components (tuple)
    pub fn spawn(&mut self, components: impl DynamicBundle) -> EntityHandle {
        EntityHandle(self.world.spawn(components))
    }

    /// Spawn an entity and attach it under `parent`
    pub fn spawn_child(
        &mut self,
        parent: EntityHandle,
        components: impl DynamicBundle,
    ) -> EntityHandle {
        let child = self.spawn(components);
        self.set_parent(child, parent);
        child
    }

    /// Re-parent `child` under `parent`. Returns false if either entity is gone
    /// or the link would create a cycle.
    pub fn set_parent(&mut self, child: EntityHandle, parent: EntityHandle) -> bool {
        if child == parent || !self.contains(child) || !self.contains(parent) {
            return false;
        }
        if self.descendants(child).contains(&parent) {
            return false;
        }

        self.detach(child);
        let _ = self.world.insert_one(child.0, Parent(parent.0));
        let appended = match self.world.get::<&mut Children>(parent.0) {
            Ok(mut children) => {
                children.0.push(child.0);
                true
            }
            Err(_) => false,
        };
        if !appended {
            let _ = self.world.insert_one(parent.0, Children(vec![child.0]));
        }
        true
    }

    /// Remove the parent link of `child`, making it a root
    pub fn detach(&mut self, child: EntityHandle) {
        let Ok(Parent(parent)) = self.world.remove_one::<Parent>(child.0) else {
            return;
        };
        if let Ok(mut siblings) = self.world.get::<&mut Children>(parent) {
            siblings.0.retain(|e| *e != child.0);
        }
    }

    /// Despawn an entity and its whole subtree. Returns how many entities were removed.
    pub fn despawn(&mut self, handle: EntityHandle) -> usize {
        if !self.contains(handle) {
            return 0;
        }
        self.detach(handle);

        let mut removed = 0;
        for entity in self.descendants(handle) {
            if self.world.despawn(entity.0).is_ok() {
                removed += 1;
            }
        }
        removed
    }

    pub fn contains(&self, handle: EntityHandle) -> bool {
        self.world.contains(handle.0)
    }

    /// Get entity count
    pub fn entity_count(&self) -> usize {
        self.world.len() as usize
    }

    /// Get immutable access to a component
    pub fn get<T: Component>(&self, handle: EntityHandle) -> Option<hecs::Ref<'_, T>> {
        self.world.get::<&T>(handle.0).ok()
    }

    /// Add or replace a component on an entity
    pub fn insert<T: Component>(&mut self, handle: EntityHandle, component: T) -> bool {
        self.world.insert_one(handle.0, component).is_ok()
    }

    pub fn parent(&self, handle: EntityHandle) -> Option<EntityHandle> {
        self.get::<Parent>(handle).map(|p| EntityHandle(p.0))
    }

    pub fn children(&self, handle: EntityHandle) -> Vec<EntityHandle> {
        self.get::<Children>(handle)
            .map(|c| c.0.iter().copied().map(EntityHandle).collect())
            .unwrap_or_default()
    }

    /// `root` followed by all of its descendants, depth first
    pub fn descendants(&self, root: EntityHandle) -> Vec<EntityHandle> {
        let mut out = Vec::new();
        if !self.contains(root) {
            return out;
        }
        let mut stack = vec![root];
        while let Some(handle) = stack.pop() {
            out.push(handle);
            let children = self.children(handle);
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Assign `layer` to `root` and every descendant. Returns the number of entities touched.
    pub fn set_layer_recursively(&mut self, root: EntityHandle, layer: Layer) -> usize {
        if !self.insert(root, layer) {
            return 0;
        }
        let mut touched = 1;
        for child in self.children(root) {
            touched += self.set_layer_recursively(child, layer);
        }
        touched
    }

    /// Layer of an entity, falling back to the default layer
    pub fn layer(&self, handle: EntityHandle) -> Layer {
        self.get::<Layer>(handle).map(|l| *l).unwrap_or_default()
    }

    /// Local-to-world matrix composed along the parent chain
    pub fn world_matrix(&self, handle: EntityHandle) -> Mat4 {
        let mut matrix = Mat4::IDENTITY;
        let mut current = Some(handle);
        // Parent links are acyclic (enforced by set_parent), so this terminates.
        while let Some(h) = current {
            if let Some(transform) = self.get::<Transform>(h) {
                matrix = transform.to_mat4() * matrix;
            }
            current = self.parent(h);
        }
        matrix
    }

    /// Entities without a parent; hidden ones are skipped unless `include_hidden`
    pub fn root_entities(&self, include_hidden: bool) -> Vec<EntityHandle> {
        let mut roots = Vec::new();
        for (entity, parent, flags) in self
            .world
            .query::<(Entity, Option<&Parent>, Option<&HideFlags>)>()
            .iter()
        {
            if parent.is_some() {
                continue;
            }
            let hidden = flags.map(|f| f.hide_in_hierarchy).unwrap_or(false);
            if include_hidden || !hidden {
                roots.push(EntityHandle(entity));
            }
        }
        roots
    }

    /// Get underlying hecs world reference
    pub fn world(&self) -> &HecsWorld {
        &self.world
    }

    /// Get mutable underlying hecs world
    pub fn world_mut(&mut self) -> &mut HecsWorld {
        &mut self.world
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn tree(world: &mut EngineWorld) -> (EntityHandle, EntityHandle, EntityHandle) {
        let root = world.spawn((Name::new("root"), Transform::from_translation(1.0, 0.0, 0.0)));
        let child = world.spawn_child(root, (Name::new("child"), Transform::from_translation(0.0, 2.0, 0.0)));
        let grandchild = world.spawn_child(child, (Name::new("grandchild"), Transform::default()));
        (root, child, grandchild)
    }

    #[test]
    fn set_layer_recursively_reaches_every_descendant() {
        let mut world = EngineWorld::new();
        let (root, child, grandchild) = tree(&mut world);
        let outsider = world.spawn((Transform::default(),));

        assert_eq!(world.set_layer_recursively(root, Layer(7)), 3);
        for h in [root, child, grandchild] {
            assert_eq!(world.layer(h), Layer(7));
        }
        assert_eq!(world.layer(outsider), Layer::DEFAULT);
    }

    #[test]
    fn despawn_removes_subtree_and_detaches_from_parent() {
        let mut world = EngineWorld::new();
        let (root, child, grandchild) = tree(&mut world);

        assert_eq!(world.despawn(child), 2);
        assert!(!world.contains(grandchild));
        assert!(world.children(root).is_empty());
        assert_eq!(world.entity_count(), 1);
    }

    #[test]
    fn world_matrix_composes_parents() {
        let mut world = EngineWorld::new();
        let (_, _, grandchild) = tree(&mut world);
        let p = world.world_matrix(grandchild).transform_point3(Vec3::ZERO);
        assert_eq!(p, Vec3::new(1.0, 2.0, 0.0));
    }

    #[test]
    fn set_parent_rejects_cycles() {
        let mut world = EngineWorld::new();
        let (root, _, grandchild) = tree(&mut world);
        assert!(!world.set_parent(root, grandchild));
        assert_eq!(world.parent(root), None);
    }

    #[test]
    fn root_entities_skip_hidden() {
        let mut world = EngineWorld::new();
        let (root, _, _) = tree(&mut world);
        let hidden = world.spawn((Transform::default(), HideFlags::HIDE_AND_DONT_SAVE));

        assert_eq!(world.root_entities(false), vec![root]);
        let all = world.root_entities(true);
        assert!(all.contains(&root) && all.contains(&hidden));
    }

    #[test]
    fn descendants_are_depth_first_in_child_order() {
        let mut world = EngineWorld::new();
        let root = world.spawn((Name::new("r"),));
        let a = world.spawn_child(root, (Name::new("a"),));
        let a1 = world.spawn_child(a, (Name::new("a1"),));
        let b = world.spawn_child(root, (Name::new("b"),));
        assert_eq!(world.descendants(root), vec![root, a, a1, b]);
    }
}
