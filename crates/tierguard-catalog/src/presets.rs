//! Per-tier settings for every managed file
//!
//! Within one file, all three tiers use the same key shape so diffs between
//! tiers line up key for key.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde_json::{json, Value};
use tierguard_codec::ConfigTree;
use tierguard_hardware::Tier;

use crate::managed::MANAGED_FILES;

static PRESETS: Lazy<HashMap<(&'static str, Tier), ConfigTree>> = Lazy::new(|| {
    let mut table = HashMap::new();
    for tier in Tier::ALL {
        let entries = [
            ("sodium-options.json", sodium(tier)),
            ("lithium.properties", lithium(tier)),
            ("ferritecore-common.toml", ferritecore(tier)),
            ("entityculling.json", entityculling(tier)),
            ("immediatelyfast.json", immediatelyfast(tier)),
            ("modernfix-mixins.properties", modernfix(tier)),
            ("sodiumleafculling.json", sodiumleafculling(tier)),
        ];
        for (filename, value) in entries {
            table.insert((filename, tier), ConfigTree::from_object(value));
        }
    }
    table
});

/// Settings for `filename` at `tier`, or `None` for an unmanaged file
pub fn preset_for(filename: &str, tier: Tier) -> Option<&'static ConfigTree> {
    MANAGED_FILES
        .iter()
        .find(|f| f.filename == filename)
        .and_then(|f| PRESETS.get(&(f.filename, tier)))
}

/// Every managed file's settings at `tier`, in apply order
pub fn presets_for_tier(tier: Tier) -> Vec<(&'static str, &'static ConfigTree)> {
    MANAGED_FILES
        .iter()
        .filter_map(|f| PRESETS.get(&(f.filename, tier)).map(|tree| (f.filename, tree)))
        .collect()
}

fn pick<T>(tier: Tier, low: T, balanced: T, high: T) -> T {
    match tier {
        Tier::LowEnd => low,
        Tier::Balanced => balanced,
        Tier::HighEnd => high,
    }
}

fn sodium(tier: Tier) -> Value {
    let low = tier == Tier::LowEnd;
    json!({
        "quality": {
            "graphics_quality": pick(tier, "fast", "default", "fancy"),
            "clouds_quality": pick(tier, "off", "fast", "fancy"),
            "weather_quality": pick(tier, "fast", "fancy", "fancy"),
            "leaves_quality": pick(tier, "fast", "fancy", "fancy"),
            "enable_vignette": !low,
            "enable_fog": !low
        },
        "performance": {
            "chunk_builder_threads": 0,
            "always_defer_chunk_updates": low,
            "use_block_face_culling": true,
            "use_compact_vertex_format": true,
            "use_fog_occlusion": true,
            "use_entity_culling": true,
            "animate_only_visible_textures": low
        },
        "rendering": {
            "render_distance": pick(tier, 4, 8, 12),
            "simulation_distance": pick(tier, 5, 8, 12),
            "entity_distance": pick(tier, 50, 100, 150),
            "brightness": 50,
            "gui_scale": 0,
            "fullscreen": false,
            "v_sync": false,
            "fps_limit": pick(tier, 60, 120, 240)
        },
        "advanced": {
            "arena_memory_allocator": "async",
            "allow_direct_memory_access": true,
            "enable_memory_tracing": false,
            "use_advanced_staging_buffers": true,
            "cpu_render_ahead_limit": pick(tier, 1, 2, 3)
        },
        "notifications": {
            "hide_donation_button": true
        }
    })
}

// Lithium has nothing worth trading away; every tier enables the same mixins
fn lithium(_tier: Tier) -> Value {
    json!({
        "mixin.ai.pathing": true,
        "mixin.ai.poi": true,
        "mixin.ai.task": true,
        "mixin.block.hopper": true,
        "mixin.chunk.serialization": true,
        "mixin.entity.collisions": true,
        "mixin.gen.cached_generator_settings": true,
        "mixin.world.block_entity_ticking": true,
        "mixin.world.chunk_ticking": true,
        "mixin.world.tick_scheduler": true
    })
}

// Memory savings only; every tier enables all of them
fn ferritecore(_tier: Tier) -> Value {
    json!({
        "mixin.blockstatecache": true,
        "mixin.flatten_states": true,
        "mixin.thread_local_random": true,
        "mixin.cache_multipart_models": true,
        "mixin.reduce_blockstate_cache_rebuilds": true
    })
}

fn entityculling(tier: Tier) -> Value {
    json!({
        "tracingDistance": pick(tier, 64, 96, 128),
        "debugMode": false,
        "skipMarkerArmorStands": true,
        "tickCulling": tier != Tier::HighEnd,
        "sleepDelay": pick(tier, 10, 5, 3),
        "hitboxes": false,
        "tracePlayers": true
    })
}

fn immediatelyfast(_tier: Tier) -> Value {
    json!({
        "experimental_screen_batching": true,
        "map_atlas_generation": true,
        "hud_batching": true,
        "fast_buffer_upload": true,
        "font_atlas_resizing": true
    })
}

fn modernfix(tier: Tier) -> Value {
    json!({
        "mixin.perf.dynamic_resources": tier != Tier::HighEnd,
        "mixin.perf.dynamic_entity_renderers": tier == Tier::LowEnd,
        "mixin.perf.faster_texture_loading": true,
        "mixin.perf.deduplicate_location": tier == Tier::LowEnd,
        "mixin.perf.reduce_blockstate_cache_rebuilds": true,
        "mixin.feature.integrated_server_watchdog": true
    })
}

fn sodiumleafculling(tier: Tier) -> Value {
    json!({
        "leafCullingMode": pick(tier, "solid_aggressive", "hollow", "check"),
        "cullHiddenLeaves": tier != Tier::HighEnd
    })
}
