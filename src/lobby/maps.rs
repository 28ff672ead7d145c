//! Selectable maps

use crate::net::protocol::GameMap;

/// Display metadata for a map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapInfo {
    pub map: GameMap,
    pub name: &'static str,
    pub description: &'static str,
}

pub const MAPS: [MapInfo; 4] = [
    MapInfo {
        map: GameMap::Island,
        name: "Training Range",
        description: "Classic training facility with cover positions",
    },
    MapInfo {
        map: GameMap::Jungle,
        name: "Jungle Compound",
        description: "Dense vegetation with elevated platforms",
    },
    MapInfo {
        map: GameMap::City,
        name: "Harbor Yard",
        description: "Industrial shipping containers and warehouses",
    },
    MapInfo {
        map: GameMap::Desert,
        name: "Desert Outpost",
        description: "Sandy terrain with fortified structures",
    },
];

impl MapInfo {
    pub fn of(map: GameMap) -> &'static MapInfo {
        match map {
            GameMap::Island => &MAPS[0],
            GameMap::Jungle => &MAPS[1],
            GameMap::City => &MAPS[2],
            GameMap::Desert => &MAPS[3],
        }
    }
}
