use engine::sim::{StaticSolid, Vec3};
use engine::{EntityDef, MotionDef, ScenarioDef, SCENARIO_FORMAT_VERSION};

pub(crate) const DEFAULT_SCENARIO: &str = "elevator";
pub(crate) const BUILTIN_SCENARIOS: [&str; 4] =
    ["elevator", "rotating_door", "crusher", "support_cycle"];

pub(crate) fn builtin(name: &str) -> Option<ScenarioDef> {
    match name {
        "elevator" => Some(elevator()),
        "rotating_door" => Some(rotating_door()),
        "crusher" => Some(crusher()),
        "support_cycle" => Some(support_cycle()),
        _ => None,
    }
}

fn scenario(name: &str, description: &str, ticks: u64) -> ScenarioDef {
    ScenarioDef {
        format_version: SCENARIO_FORMAT_VERSION,
        name: name.to_string(),
        description: description.to_string(),
        ticks: Some(ticks),
        despawn_crushed: false,
        solids: Vec::new(),
        entities: Vec::new(),
        motions: Vec::new(),
    }
}

fn boxed(name: &str, origin: Vec3, half: Vec3, height: f32) -> EntityDef {
    EntityDef {
        name: name.to_string(),
        origin,
        angles: Vec3::ZERO,
        mins: Vec3::new(-half.x, -half.y, 0.0),
        maxs: Vec3::new(half.x, half.y, height),
        solid: true,
        crushable: false,
        ground: None,
        attached_to: None,
    }
}

fn platform(name: &str, origin: Vec3, half: f32) -> EntityDef {
    EntityDef {
        mins: Vec3::new(-half, -half, -8.0),
        maxs: Vec3::new(half, half, 0.0),
        ..boxed(name, origin, Vec3::new(half, half, 0.0), 0.0)
    }
}

fn on(mut entity: EntityDef, ground: &str) -> EntityDef {
    entity.ground = Some(ground.to_string());
    entity
}

fn attached(mut entity: EntityDef, parent: &str) -> EntityDef {
    entity.attached_to = Some(parent.to_string());
    entity
}

fn crushable(mut entity: EntityDef) -> EntityDef {
    entity.crushable = true;
    entity
}

fn motion(mover: &str, linear_velocity: Vec3, angular_velocity: Vec3) -> MotionDef {
    MotionDef {
        mover: mover.to_string(),
        linear_velocity,
        angular_velocity,
        travel_ticks: None,
        crush_on_block: false,
        reverse_on_block: false,
    }
}

fn slab(name: &str, z: f32) -> StaticSolid {
    StaticSolid {
        name: name.to_string(),
        mins: Vec3::new(-256.0, -256.0, z),
        maxs: Vec3::new(256.0, 256.0, z + 32.0),
    }
}

fn crate_half() -> Vec3 {
    Vec3::new(12.0, 12.0, 0.0)
}

/// A lift carrying two crates, one of them with a third crate stacked on top.
fn elevator() -> ScenarioDef {
    let mut def = scenario(
        "elevator",
        "Lift rises and falls carrying a stack of crates",
        480,
    );
    def.solids.push(slab("ceiling", 400.0));
    def.entities = vec![
        platform("lift", Vec3::ZERO, 64.0),
        on(boxed("crate_a", Vec3::new(-24.0, 0.0, 0.0), crate_half(), 24.0), "lift"),
        on(boxed("crate_b", Vec3::new(24.0, 0.0, 0.0), crate_half(), 24.0), "lift"),
        on(boxed("crate_top", Vec3::new(-24.0, 0.0, 24.0), crate_half(), 24.0), "crate_a"),
    ];
    def.motions.push(MotionDef {
        travel_ticks: Some(120),
        ..motion("lift", Vec3::new(0.0, 0.0, 64.0), Vec3::ZERO)
    });
    def
}

/// A hinge swinging an attached panel, which in turn carries a sign.
fn rotating_door() -> ScenarioDef {
    let mut def = scenario(
        "rotating_door",
        "Hinge swings a door panel and its sign a quarter turn back and forth",
        480,
    );
    def.entities = vec![
        boxed("hinge", Vec3::ZERO, Vec3::new(4.0, 4.0, 0.0), 64.0),
        attached(
            boxed("panel", Vec3::new(32.0, 0.0, 0.0), Vec3::new(28.0, 2.0, 0.0), 64.0),
            "hinge",
        ),
        attached(
            boxed("sign", Vec3::new(64.0, 0.0, 48.0), Vec3::new(4.0, 1.0, 0.0), 12.0),
            "panel",
        ),
    ];
    def.motions.push(MotionDef {
        travel_ticks: Some(120),
        ..motion("hinge", Vec3::ZERO, Vec3::new(0.0, 45.0, 0.0))
    });
    def
}

/// A press plate lifts a barrel through a rat and into the ceiling.
fn crusher() -> ScenarioDef {
    let mut def = scenario(
        "crusher",
        "Press plate crushes a bystander, then its own load against the ceiling",
        300,
    );
    def.despawn_crushed = true;
    def.solids.push(slab("ceiling", 96.0));
    def.entities = vec![
        platform("press_plate", Vec3::ZERO, 32.0),
        crushable(on(
            boxed("barrel", Vec3::ZERO, crate_half(), 32.0),
            "press_plate",
        )),
        crushable(boxed("rat", Vec3::new(0.0, 0.0, 60.0), Vec3::new(6.0, 6.0, 0.0), 10.0)),
    ];
    def.motions.push(MotionDef {
        travel_ticks: Some(150),
        crush_on_block: true,
        ..motion("press_plate", Vec3::new(0.0, 0.0, 32.0), Vec3::ZERO)
    });
    def
}

/// Riders whose support links loop back on each other and onto the mover.
fn support_cycle() -> ScenarioDef {
    let mut def = scenario(
        "support_cycle",
        "Sliding base whose riders form a support cycle through the base itself",
        240,
    );
    let half = Vec3::new(8.0, 8.0, 0.0);
    def.entities = vec![
        attached(platform("base", Vec3::ZERO, 32.0), "c"),
        attached(on(boxed("a", Vec3::ZERO, half, 16.0), "base"), "b"),
        on(boxed("b", Vec3::new(0.0, 0.0, 16.0), half, 16.0), "a"),
        on(boxed("c", Vec3::new(0.0, 0.0, 32.0), half, 16.0), "b"),
    ];
    def.motions.push(MotionDef {
        travel_ticks: Some(60),
        ..motion("base", Vec3::new(32.0, 0.0, 0.0), Vec3::ZERO)
    });
    def
}
