//! Snapshot index of bridge resources.
//!
//! The translator is pure, so everything it needs to name resources and
//! walk ownership (scene -> room -> grouped_light) is prefetched here at
//! factory time and again on discovery.

use std::collections::HashMap;

use crate::domain::errors::EngineResult;

use super::client::HueClient;

#[derive(Debug, Clone, Default)]
pub struct HueResourceIndex {
    /// Resource id to display name (lights, rooms, scenes).
    names: HashMap<String, String>,
    /// Room id to its grouped_light id.
    room_grouped_light: HashMap<String, String>,
    /// Grouped_light id to the owning room's name.
    grouped_light_names: HashMap<String, String>,
    /// Scene id to the grouped_light id of its room.
    scene_owner: HashMap<String, String>,
}

impl HueResourceIndex {
    pub async fn load(client: &HueClient) -> EngineResult<Self> {
        let mut index = Self::default();

        for light in client.lights().await? {
            index.names.insert(light.id, light.metadata.name);
        }

        for room in client.rooms().await? {
            index
                .names
                .insert(room.id.clone(), room.metadata.name.clone());
            for service in &room.services {
                if service.rtype == "grouped_light" {
                    index
                        .room_grouped_light
                        .insert(room.id.clone(), service.rid.clone());
                    index
                        .grouped_light_names
                        .insert(service.rid.clone(), room.metadata.name.clone());
                }
            }
        }

        for scene in client.scenes().await? {
            index
                .names
                .insert(scene.id.clone(), scene.metadata.name.clone());
            if let Some(grouped) = index.room_grouped_light.get(&scene.group.rid) {
                index.scene_owner.insert(scene.id, grouped.clone());
            }
        }

        Ok(index)
    }

    pub fn name(&self, id: &str) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    pub fn grouped_light_name(&self, grouped_light_id: &str) -> Option<&str> {
        self.grouped_light_names
            .get(grouped_light_id)
            .map(String::as_str)
    }

    /// The grouped_light that owns a scene, if its room exposes one.
    pub fn scene_owner(&self, scene_id: &str) -> Option<&str> {
        self.scene_owner.get(scene_id).map(String::as_str)
    }

    #[cfg(test)]
    pub fn for_tests(
        names: &[(&str, &str)],
        grouped_light_names: &[(&str, &str)],
        scene_owner: &[(&str, &str)],
    ) -> Self {
        Self {
            names: names
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            room_grouped_light: HashMap::new(),
            grouped_light_names: grouped_light_names
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            scene_owner: scene_owner
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        }
    }
}
