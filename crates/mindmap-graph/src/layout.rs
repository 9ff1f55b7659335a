use mindmap_core::Vec2;
use serde::{Deserialize, Serialize};

/// Force-directed simulation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Rest length of the spring along each edge.
    pub spring_length: f64,
    pub spring_stiffness: f64,
    /// Pairwise repulsion constant (inverse-square).
    pub repulsion: f64,
    /// Pull of every node toward the origin.
    pub centering: f64,
    /// Velocity retained per tick.
    pub damping: f64,
    /// Iteration budget; the simulation freezes after this many ticks.
    pub max_iterations: usize,
    /// Below this top speed (canvas px per tick) the layout counts as stable.
    pub stable_speed: f64,
    pub max_step: f64,
    pub min_distance: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            spring_length: 200.0,
            spring_stiffness: 0.04,
            repulsion: 20_000.0,
            centering: 0.002,
            damping: 0.85,
            max_iterations: 400,
            stable_speed: 0.05,
            max_step: 40.0,
            min_distance: 20.0,
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("spring_length", self.spring_length),
            ("spring_stiffness", self.spring_stiffness),
            ("repulsion", self.repulsion),
            ("centering", self.centering),
            ("stable_speed", self.stable_speed),
            ("max_step", self.max_step),
            ("min_distance", self.min_distance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{field} must be a non-negative number, got {value}"));
            }
        }
        if !(self.damping > 0.0 && self.damping < 1.0) {
            return Err(format!("damping must be in (0, 1), got {}", self.damping));
        }
        if self.max_iterations == 0 {
            return Err("max_iterations must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Simulated state of one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub position: Vec2,
    pub velocity: Vec2,
    /// Pinned bodies push and pull others but never move.
    pub pinned: bool,
}

impl Body {
    pub fn pinned(position: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            pinned: true,
        }
    }

    pub fn free(position: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            pinned: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutStatus {
    Running,
    /// Movement settled below the threshold.
    Stable,
    /// The iteration budget ran out first.
    Exhausted,
}

impl LayoutStatus {
    pub fn is_frozen(self) -> bool {
        self != LayoutStatus::Running
    }
}

/// Spring/repulsion/centering simulation with a bounded iteration budget.
#[derive(Debug, Clone)]
pub struct ForceLayout {
    config: LayoutConfig,
    iterations: usize,
    status: LayoutStatus,
}

impl ForceLayout {
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            config,
            iterations: 0,
            status: LayoutStatus::Stable,
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn status(&self) -> LayoutStatus {
        self.status
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Starts a fresh budget, e.g. after nodes or edges were added.
    pub fn restart(&mut self) {
        self.iterations = 0;
        self.status = LayoutStatus::Running;
    }

    /// Advances one tick. `springs` index into `bodies`.
    pub fn step(&mut self, bodies: &mut [Body], springs: &[(usize, usize)]) -> LayoutStatus {
        if self.status.is_frozen() {
            return self.status;
        }
        if bodies.iter().all(|b| b.pinned) {
            self.status = LayoutStatus::Stable;
            return self.status;
        }

        let forces = self.forces(bodies, springs);
        let mut top_speed: f64 = 0.0;
        for (body, force) in bodies.iter_mut().zip(forces) {
            if body.pinned {
                body.velocity = Vec2::ZERO;
                continue;
            }
            let mut velocity = (body.velocity + force) * self.config.damping;
            let speed = velocity.length();
            if speed > self.config.max_step {
                velocity = velocity * (self.config.max_step / speed);
            }
            body.velocity = velocity;
            body.position = body.position + velocity;
            top_speed = top_speed.max(velocity.length());
        }

        self.iterations += 1;
        if top_speed < self.config.stable_speed {
            tracing::debug!(iterations = self.iterations, "Layout stabilized");
            self.status = LayoutStatus::Stable;
        } else if self.iterations >= self.config.max_iterations {
            tracing::debug!(iterations = self.iterations, top_speed, "Layout budget exhausted");
            self.status = LayoutStatus::Exhausted;
        }
        self.status
    }

    fn forces(&self, bodies: &[Body], springs: &[(usize, usize)]) -> Vec<Vec2> {
        let cfg = &self.config;
        let mut forces = vec![Vec2::ZERO; bodies.len()];

        for i in 0..bodies.len() {
            for j in (i + 1)..bodies.len() {
                let delta = bodies[i].position - bodies[j].position;
                let len = delta.length();
                let dir = if len > 1e-6 {
                    delta * (1.0 / len)
                } else {
                    // Coincident bodies: separate along a fixed per-pair angle.
                    let angle = (i * 31 + j * 17) as f64;
                    Vec2::new(angle.cos(), angle.sin())
                };
                let dist = len.max(cfg.min_distance);
                let push = dir * (cfg.repulsion / (dist * dist));
                forces[i] = forces[i] + push;
                forces[j] = forces[j] - push;
            }
        }

        for &(a, b) in springs {
            if a == b || a >= bodies.len() || b >= bodies.len() {
                continue;
            }
            let delta = bodies[b].position - bodies[a].position;
            let len = delta.length();
            if len <= 1e-6 {
                continue;
            }
            let pull = delta * (cfg.spring_stiffness * (len - cfg.spring_length) / len);
            forces[a] = forces[a] + pull;
            forces[b] = forces[b] - pull;
        }

        for (force, body) in forces.iter_mut().zip(bodies) {
            *force = *force - body.position * cfg.centering;
        }
        forces
    }

    /// Runs until frozen. Returns the number of ticks taken.
    pub fn run(&mut self, bodies: &mut [Body], springs: &[(usize, usize)]) -> usize {
        self.restart();
        let start = self.iterations;
        while !self.step(bodies, springs).is_frozen() {}
        self.iterations - start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pinned_bodies_never_move() {
        let mut layout = ForceLayout::new(LayoutConfig::default());
        let mut bodies = vec![
            Body::pinned(Vec2::new(0.0, 0.0)),
            Body::pinned(Vec2::new(10.0, 0.0)),
        ];
        layout.restart();
        assert_eq!(layout.step(&mut bodies, &[(0, 1)]), LayoutStatus::Stable);
        assert_eq!(bodies[0].position, Vec2::new(0.0, 0.0));
        assert_eq!(bodies[1].position, Vec2::new(10.0, 0.0));
    }

    #[test]
    fn test_free_node_settles_near_spring_length() {
        let config = LayoutConfig {
            centering: 0.0,
            ..Default::default()
        };
        let spring_length = config.spring_length;
        let mut layout = ForceLayout::new(config);
        let mut bodies = vec![
            Body::pinned(Vec2::ZERO),
            Body::free(Vec2::new(600.0, 0.0)),
        ];
        let ticks = layout.run(&mut bodies, &[(0, 1)]);
        assert!(ticks <= layout.config().max_iterations);
        assert_eq!(bodies[0].position, Vec2::ZERO);
        let dist = bodies[1].position.length();
        assert!(
            (dist - spring_length).abs() < spring_length * 0.5,
            "settled at {dist}"
        );
    }

    #[test]
    fn test_coincident_nodes_are_pushed_apart() {
        let mut layout = ForceLayout::new(LayoutConfig::default());
        let mut bodies = vec![Body::pinned(Vec2::ZERO), Body::free(Vec2::ZERO)];
        layout.restart();
        layout.step(&mut bodies, &[]);
        assert!(bodies[1].position.length() > 0.0);
        assert!(bodies[1].position.is_finite());
    }

    #[test]
    fn test_budget_freezes_simulation() {
        let config = LayoutConfig {
            max_iterations: 3,
            stable_speed: 0.0,
            ..Default::default()
        };
        let mut layout = ForceLayout::new(config);
        let mut bodies = vec![Body::free(Vec2::ZERO), Body::free(Vec2::new(5.0, 0.0))];
        assert_eq!(layout.run(&mut bodies, &[]), 3);
        assert_eq!(layout.status(), LayoutStatus::Exhausted);
        let frozen = bodies.clone();
        layout.step(&mut bodies, &[]);
        assert_eq!(bodies, frozen);
    }

    #[test]
    fn test_validate() {
        assert!(LayoutConfig::default().validate().is_ok());
        let bad = LayoutConfig {
            damping: 1.5,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
