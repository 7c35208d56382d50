//! Minimal-risk settings written during safe boot recovery

use once_cell::sync::Lazy;
use serde_json::json;
use tierguard_codec::ConfigTree;

use crate::managed::{managed_file, ManagedFile};

static SAFE_BOOT: Lazy<Vec<(&'static ManagedFile, ConfigTree)>> = Lazy::new(|| {
    let entries = [
        (
            "sodium-options.json",
            json!({
                "quality": {
                    "graphics_quality": "fast",
                    "clouds_quality": "off",
                    "weather_quality": "off",
                    "leaves_quality": "fast"
                },
                "rendering": {
                    "render_distance": 4,
                    "simulation_distance": 5,
                    "fps_limit": 60,
                    "v_sync": true
                },
                "advanced": {
                    "use_advanced_staging_buffers": false,
                    "cpu_render_ahead_limit": 1,
                    "allow_direct_memory_access": false
                }
            }),
        ),
        (
            "lithium.properties",
            json!({
                "mixin.ai.pathing": true,
                "mixin.entity.collisions": true,
                "mixin.world.chunk_access": true
            }),
        ),
        (
            "entityculling.json",
            json!({
                "tracingDistance": 32,
                "tickCulling": true,
                "skipMarkerArmorStands": true
            }),
        ),
    ];

    entries
        .into_iter()
        .filter_map(|(name, value)| managed_file(name).map(|file| (file, ConfigTree::from_object(value))))
        .collect()
});

/// Files overwritten by safe boot, with their full replacement contents
pub fn safe_boot_configs() -> &'static [(&'static ManagedFile, ConfigTree)] {
    &SAFE_BOOT
}
