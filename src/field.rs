use crate::config::SimConfig;
use crate::entity::{Entity, EntityId};
use crate::protocol::{now_millis, FrameSnapshot};
use glam::DVec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Camera field of regard. Origin fixed at (0, 0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewRegion {
    pub width: f64,
    pub height: f64,
}

impl ViewRegion {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Half-open containment: the far edges are outside.
    pub fn contains(&self, point: DVec2) -> bool {
        point.x >= 0.0 && point.y >= 0.0 && point.x < self.width && point.y < self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldParams {
    pub max_entities: usize,
    pub spawn_probability: f64,
    pub mean_size: f64,
    pub size_stddev: f64,
    pub max_speed: f64,
}

impl From<&SimConfig> for FieldParams {
    fn from(config: &SimConfig) -> Self {
        Self {
            max_entities: config.max_entities,
            spawn_probability: config.spawn_probability,
            mean_size: config.mean_size,
            size_stddev: config.size_stddev,
            max_speed: config.max_speed,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    pub stepped: usize,
    pub culled: usize,
    pub spawned: bool,
}

/// Seeded uniform source plus a cached second Gaussian deviate.
///
/// The polar method yields normals in pairs; the spare is consumed by the
/// next call so the draw sequence depends only on the seed.
#[derive(Debug)]
struct SeededSource {
    rng: Pcg32,
    spare_gaussian: Option<f64>,
}

impl SeededSource {
    fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            spare_gaussian: None,
        }
    }

    fn unit(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    fn coin(&mut self) -> bool {
        self.rng.random::<bool>()
    }

    fn gaussian(&mut self) -> f64 {
        if let Some(spare) = self.spare_gaussian.take() {
            return spare;
        }
        loop {
            let u = self.unit() * 2.0 - 1.0;
            let v = self.unit() * 2.0 - 1.0;
            let s = u * u + v * v;
            if s > 0.0 && s < 1.0 {
                let scale = (-2.0 * s.ln() / s).sqrt();
                self.spare_gaussian = Some(v * scale);
                return u * scale;
            }
        }
    }
}

/// Owns the live debris set and advances it.
///
/// Not internally synchronized: exactly one caller drives `tick()`. Shared
/// access goes through a single mutex owned by the session.
#[derive(Debug)]
pub struct FieldSimulator {
    entities: Vec<Entity>,
    next_id: EntityId,
    source: SeededSource,
    view: ViewRegion,
    params: FieldParams,
}

impl FieldSimulator {
    pub fn new(seed: u64, view: ViewRegion, params: FieldParams) -> Self {
        Self {
            entities: Vec::with_capacity(params.max_entities),
            next_id: 0,
            source: SeededSource::new(seed),
            view,
            params,
        }
    }

    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(
            config.seed,
            ViewRegion::new(config.view_width, config.view_height),
            FieldParams::from(config),
        )
    }

    /// Populate the field with up to `count` fresh entities, never past the cap.
    pub fn initialize(&mut self, count: usize) {
        let room = self.params.max_entities.saturating_sub(self.entities.len());
        for _ in 0..count.min(room) {
            let entity = self.spawn();
            self.entities.push(entity);
        }
        debug!("Field initialized with {} entities", self.entities.len());
    }

    pub fn tick(&mut self) -> TickReport {
        let stepped = self.entities.len();
        for entity in &mut self.entities {
            entity.step();
        }

        let view = self.view;
        self.entities.retain(|entity| view.contains(entity.position));
        let culled = stepped - self.entities.len();

        // The draw happens every tick so the sequence is independent of the count.
        let roll = self.source.unit();
        let spawned = roll < self.params.spawn_probability
            && self.entities.len() < self.params.max_entities;
        if spawned {
            let entity = self.spawn();
            self.entities.push(entity);
        }

        TickReport {
            stepped,
            culled,
            spawned,
        }
    }

    pub fn snapshot(&self) -> FrameSnapshot {
        self.snapshot_at(now_millis())
    }

    pub fn snapshot_at(&self, timestamp_ms: u64) -> FrameSnapshot {
        FrameSnapshot {
            entities: self.entities.clone(),
            timestamp_ms,
        }
    }

    pub fn lookup(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.id() == id)
    }

    /// Copy of the live entity, or the documented placeholder on a miss.
    pub fn lookup_or_placeholder(&self, id: EntityId) -> Entity {
        self.lookup(id).cloned().unwrap_or_else(Entity::placeholder)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn view(&self) -> ViewRegion {
        self.view
    }

    pub fn next_id(&self) -> EntityId {
        self.next_id
    }

    fn spawn(&mut self) -> Entity {
        let position = self.random_position();
        let velocity = self.random_velocity();
        let size = self.random_size();
        let id = self.next_id;
        self.next_id += 1;
        Entity::new(id, position, velocity, size)
    }

    fn random_position(&mut self) -> DVec2 {
        let x = self.source.unit() * self.view.width;
        let y = self.source.unit() * self.view.height;
        DVec2::new(x, y)
    }

    /// Unit direction on a half-circle with a random vertical sign, scaled by a
    /// uniform speed in `[0, max_speed)`.
    fn random_velocity(&mut self) -> DVec2 {
        let x = self.source.unit() * 2.0 - 1.0;
        let sign = if self.source.coin() { 1.0 } else { -1.0 };
        let y = (1.0 - x * x).sqrt() * sign;
        let speed = self.params.max_speed * self.source.unit();
        DVec2::new(x, y) * speed
    }

    /// Folded normal around the mean. Zero is redrawn so the size stays positive.
    fn random_size(&mut self) -> f64 {
        if self.params.size_stddev == 0.0 {
            return self.params.mean_size.abs().max(f64::MIN_POSITIVE);
        }
        loop {
            let size = (self.source.gaussian() * self.params.size_stddev + self.params.mean_size).abs();
            if size > 0.0 {
                return size;
            }
        }
    }
}
