//! Multi-pointer gesture controller.
//!
//! Composes the single-pointer [`TapRecognizer`] with pinch, pan and node drag
//! so that exactly one semantic outcome fires per physical interaction:
//!
//! - two contacts start a pinch, which owns zoom exclusively and cancels any
//!   pending tap, long press or drag;
//! - a drag that starts on a node moves the node, never the canvas;
//! - a drag on empty canvas pans when enough contacts are down;
//! - tap, double tap and long press resolve against the node under the
//!   pointer at press time.
//!
//! Every pointer position is in screen space; canvas coordinates are derived
//! by inverting the current view transform.

use crate::config::GestureConfig;
use crate::hit::HitTest;
use crate::tap::{TapOutcome, TapRecognizer};
use mindmap_core::{NodeId, Vec2, ViewTransform};
use mindmap_events::SurfaceMessage;
use std::collections::BTreeMap;
use std::time::Instant;

pub type PointerId = u64;

#[derive(Debug, Clone, PartialEq)]
pub enum GestureIntent {
    /// A semantic event, identical to what the embedded surface emits.
    Message(SurfaceMessage),
    /// The pan/zoom transform changed.
    View(ViewTransform),
}

#[derive(Debug, Clone, PartialEq)]
enum Interaction {
    Idle,
    Press {
        pointer: PointerId,
        target: Option<(NodeId, Vec2)>,
    },
    NodeDrag {
        pointer: PointerId,
        node_id: NodeId,
        grab_offset: Vec2,
    },
    Pan {
        pointer: PointerId,
    },
    Pinch {
        a: PointerId,
        b: PointerId,
        start_distance: f64,
        start_zoom: f64,
        last_focal: Vec2,
    },
    /// Contacts remain down after an interaction that already resolved.
    Settling,
}

pub struct GestureController {
    config: GestureConfig,
    view: ViewTransform,
    pointers: BTreeMap<PointerId, Vec2>,
    recognizer: TapRecognizer,
    interaction: Interaction,
    /// What the last provisional tap landed on; `Some(None)` is the canvas.
    last_tap_target: Option<Option<NodeId>>,
}

impl GestureController {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            recognizer: TapRecognizer::new(config.clone()),
            config,
            view: ViewTransform::default(),
            pointers: BTreeMap::new(),
            interaction: Interaction::Idle,
            last_tap_target: None,
        }
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    pub fn view(&self) -> ViewTransform {
        self.view
    }

    /// Replaces the transform, e.g. after a programmatic fit or focus.
    pub fn set_view(&mut self, view: ViewTransform) {
        if view.is_valid() {
            self.view = view;
        }
    }

    pub fn active_pointers(&self) -> usize {
        self.pointers.len()
    }

    pub fn is_dragging_node(&self) -> bool {
        matches!(self.interaction, Interaction::NodeDrag { .. })
    }

    pub fn dragged_node(&self) -> Option<&NodeId> {
        match &self.interaction {
            Interaction::NodeDrag { node_id, .. } => Some(node_id),
            _ => None,
        }
    }

    pub fn pointer_down<H: HitTest + ?Sized>(
        &mut self,
        pointer: PointerId,
        screen: Vec2,
        now: Instant,
        hits: &H,
    ) -> Vec<GestureIntent> {
        self.pointers.insert(pointer, screen);
        match self.pointers.len() {
            1 => {
                let target = hits.node_at(self.view.screen_to_canvas(screen));
                self.recognizer.pointer_down(screen, now);
                self.interaction = Interaction::Press { pointer, target };
            }
            2 => self.begin_pinch(),
            _ => {}
        }
        Vec::new()
    }

    fn begin_pinch(&mut self) {
        self.recognizer.cancel();
        let mut contacts = self.pointers.iter();
        let (Some((&a, &pa)), Some((&b, &pb))) = (contacts.next(), contacts.next()) else {
            return;
        };
        let start_distance = pa.distance(pb);
        if start_distance < 1.0 {
            self.interaction = Interaction::Settling;
            return;
        }
        if let Interaction::NodeDrag { node_id, .. } = &self.interaction {
            tracing::debug!(%node_id, "Node drag interrupted by pinch");
        }
        self.interaction = Interaction::Pinch {
            a,
            b,
            start_distance,
            start_zoom: self.view.zoom,
            last_focal: midpoint(pa, pb),
        };
    }

    pub fn pointer_move(&mut self, pointer: PointerId, screen: Vec2, now: Instant) -> Vec<GestureIntent> {
        let Some(slot) = self.pointers.get_mut(&pointer) else {
            return Vec::new();
        };
        *slot = screen;

        match self.interaction.clone() {
            Interaction::Press {
                pointer: owner,
                target,
            } if owner == pointer => match self.recognizer.pointer_move(screen, now) {
                Some(TapOutcome::LongPress { point }) => self.long_press(target, point),
                Some(TapOutcome::DragStart { origin, point }) => self.begin_drag(pointer, target, origin, point),
                _ => Vec::new(),
            },
            Interaction::NodeDrag {
                pointer: owner,
                node_id,
                grab_offset,
            } if owner == pointer => match self.recognizer.pointer_move(screen, now) {
                Some(TapOutcome::DragMove { point, .. }) => {
                    vec![self.node_move(node_id, point, grab_offset)]
                }
                _ => Vec::new(),
            },
            Interaction::Pan { pointer: owner } if owner == pointer => {
                match self.recognizer.pointer_move(screen, now) {
                    Some(TapOutcome::DragMove { delta, .. }) => {
                        self.view.pan = self.view.pan + delta;
                        vec![GestureIntent::View(self.view)]
                    }
                    _ => Vec::new(),
                }
            }
            Interaction::Pinch {
                a,
                b,
                start_distance,
                start_zoom,
                last_focal,
            } if pointer == a || pointer == b => {
                let (Some(&pa), Some(&pb)) = (self.pointers.get(&a), self.pointers.get(&b)) else {
                    return Vec::new();
                };
                let focal = midpoint(pa, pb);
                // Content follows the fingers, then scales about them.
                self.view.pan = self.view.pan + (focal - last_focal);
                let zoom = start_zoom * pa.distance(pb) / start_distance;
                self.view
                    .zoom_about(focal, zoom, self.config.min_zoom, self.config.max_zoom);
                self.interaction = Interaction::Pinch {
                    a,
                    b,
                    start_distance,
                    start_zoom,
                    last_focal: focal,
                };
                vec![GestureIntent::View(self.view)]
            }
            _ => Vec::new(),
        }
    }

    fn begin_drag(
        &mut self,
        pointer: PointerId,
        target: Option<(NodeId, Vec2)>,
        origin: Vec2,
        point: Vec2,
    ) -> Vec<GestureIntent> {
        match target {
            Some((node_id, center)) => {
                let grab_offset = center - self.view.screen_to_canvas(origin);
                self.interaction = Interaction::NodeDrag {
                    pointer,
                    node_id: node_id.clone(),
                    grab_offset,
                };
                vec![self.node_move(node_id, point, grab_offset)]
            }
            None if self.pointers.len() >= self.config.pan_min_pointers => {
                self.interaction = Interaction::Pan { pointer };
                self.view.pan = self.view.pan + (point - origin);
                vec![GestureIntent::View(self.view)]
            }
            None => {
                self.interaction = Interaction::Settling;
                Vec::new()
            }
        }
    }

    fn node_move(&self, node_id: NodeId, screen: Vec2, grab_offset: Vec2) -> GestureIntent {
        let position = self.view.screen_to_canvas(screen) + grab_offset;
        GestureIntent::Message(SurfaceMessage::NodeMove {
            node_id,
            x: position.x,
            y: position.y,
        })
    }

    fn long_press(&self, target: Option<(NodeId, Vec2)>, screen: Vec2) -> Vec<GestureIntent> {
        let Some((node_id, _)) = target else {
            return Vec::new();
        };
        let at = self.view.screen_to_canvas(screen);
        vec![GestureIntent::Message(SurfaceMessage::LongPress {
            node_id,
            x: at.x,
            y: at.y,
        })]
    }

    /// Drives the long-press timer. Call from the host's frame or tick loop.
    pub fn poll(&mut self, now: Instant) -> Vec<GestureIntent> {
        if let Interaction::Press { target, .. } = self.interaction.clone()
            && let Some(TapOutcome::LongPress { point }) = self.recognizer.poll(now)
        {
            return self.long_press(target, point);
        }
        Vec::new()
    }

    pub fn pointer_up(&mut self, pointer: PointerId, screen: Vec2, now: Instant) -> Vec<GestureIntent> {
        if self.pointers.remove(&pointer).is_none() {
            return Vec::new();
        }

        let intents = match self.interaction.clone() {
            Interaction::Press {
                pointer: owner,
                target,
            } if owner == pointer => match self.recognizer.pointer_up(screen, now) {
                Some(TapOutcome::Tap { .. }) => {
                    let node_id = target.map(|(id, _)| id);
                    self.last_tap_target = Some(node_id.clone());
                    vec![GestureIntent::Message(SurfaceMessage::NodeSelect { node_id })]
                }
                Some(TapOutcome::DoubleTap { point }) => {
                    let node_id = target.map(|(id, _)| id);
                    let first = self.last_tap_target.take();
                    if first.is_some_and(|first| first != node_id) {
                        // Taps on different targets never pair; this one
                        // opens a new pair instead.
                        self.recognizer.restart_pair(point, now);
                        self.last_tap_target = Some(node_id.clone());
                        vec![GestureIntent::Message(SurfaceMessage::NodeSelect { node_id })]
                    } else if let Some(node_id) = node_id {
                        vec![GestureIntent::Message(SurfaceMessage::NodeDoubleTap { node_id })]
                    } else {
                        let at = self.view.screen_to_canvas(point);
                        vec![GestureIntent::Message(SurfaceMessage::AddNode { x: at.x, y: at.y })]
                    }
                }
                Some(TapOutcome::LongPress { point }) => self.long_press(target, point),
                _ => Vec::new(),
            },
            Interaction::NodeDrag { pointer: owner, .. } | Interaction::Pan { pointer: owner }
                if owner == pointer =>
            {
                self.recognizer.pointer_up(screen, now);
                Vec::new()
            }
            _ => Vec::new(),
        };

        self.interaction = if self.pointers.is_empty() {
            Interaction::Idle
        } else {
            match self.interaction {
                Interaction::Press { pointer: owner, .. } if owner != pointer => {
                    self.interaction.clone()
                }
                _ => Interaction::Settling,
            }
        };
        intents
    }

    /// Wheel or toolbar zoom by `steps` notches about a screen point.
    pub fn zoom_steps(&mut self, anchor: Vec2, steps: f64) -> Vec<GestureIntent> {
        let zoom = self.view.zoom * self.config.zoom_step.powf(steps);
        let before = self.view;
        self.view
            .zoom_about(anchor, zoom, self.config.min_zoom, self.config.max_zoom);
        if self.view == before {
            return Vec::new();
        }
        vec![GestureIntent::View(self.view)]
    }

    /// Drops all contacts, e.g. when the host loses focus.
    pub fn cancel(&mut self) {
        self.pointers.clear();
        self.recognizer.cancel();
        self.interaction = Interaction::Idle;
        self.last_tap_target = None;
    }
}

fn midpoint(a: Vec2, b: Vec2) -> Vec2 {
    (a + b) * 0.5
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindmap_core::{Document, DocumentId, Node};
    use std::time::Duration;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn doc() -> Document {
        let mut doc = Document::new(DocumentId::new("d"), "Map");
        doc.insert_node(Node::new(NodeId::new("n"), "Node", Vec2::new(0.0, 0.0)))
            .unwrap();
        doc
    }

    fn messages(intents: Vec<GestureIntent>) -> Vec<SurfaceMessage> {
        intents
            .into_iter()
            .filter_map(|intent| match intent {
                GestureIntent::Message(message) => Some(message),
                GestureIntent::View(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_tap_selects_node_or_clears_on_canvas() {
        let doc = doc();
        let mut c = GestureController::new(GestureConfig::default());
        let t0 = Instant::now();

        c.pointer_down(1, Vec2::ZERO, t0, &doc);
        let out = messages(c.pointer_up(1, Vec2::ZERO, t0 + ms(50)));
        assert_eq!(
            out,
            vec![SurfaceMessage::NodeSelect {
                node_id: Some(NodeId::new("n"))
            }]
        );

        let empty = Vec2::new(400.0, 400.0);
        c.pointer_down(1, empty, t0 + ms(1000), &doc);
        let out = messages(c.pointer_up(1, empty, t0 + ms(1050)));
        assert_eq!(out, vec![SurfaceMessage::NodeSelect { node_id: None }]);
    }

    #[test]
    fn test_double_tap_on_canvas_adds_node_at_canvas_point() {
        let doc = doc();
        let mut c = GestureController::new(GestureConfig::default());
        c.set_view(ViewTransform::new(2.0, Vec2::new(100.0, 50.0)));
        let t0 = Instant::now();
        let screen = Vec2::new(700.0, 650.0);

        c.pointer_down(7, screen, t0, &doc);
        c.pointer_up(7, screen, t0 + ms(40));
        c.pointer_down(7, screen, t0 + ms(150), &doc);
        let out = messages(c.pointer_up(7, screen, t0 + ms(190)));
        assert_eq!(out, vec![SurfaceMessage::AddNode { x: 300.0, y: 300.0 }]);
    }

    #[test]
    fn test_double_tap_on_node_requests_edit() {
        let doc = doc();
        let mut c = GestureController::new(GestureConfig::default());
        let t0 = Instant::now();
        c.pointer_down(1, Vec2::ZERO, t0, &doc);
        c.pointer_up(1, Vec2::ZERO, t0 + ms(40));
        c.pointer_down(1, Vec2::ZERO, t0 + ms(120), &doc);
        let out = messages(c.pointer_up(1, Vec2::ZERO, t0 + ms(160)));
        assert_eq!(
            out,
            vec![SurfaceMessage::NodeDoubleTap {
                node_id: NodeId::new("n")
            }]
        );
    }

    /// Two nodes meeting at x = 0.
    struct Neighbours;

    impl HitTest for Neighbours {
        fn node_at(&self, canvas: Vec2) -> Option<(NodeId, Vec2)> {
            if canvas.x < 0.0 {
                Some((NodeId::new("left"), Vec2::new(-50.0, 0.0)))
            } else {
                Some((NodeId::new("right"), Vec2::new(50.0, 0.0)))
            }
        }
    }

    #[test]
    fn test_quick_taps_on_neighbouring_nodes_do_not_pair() {
        let mut c = GestureController::new(GestureConfig::default());
        let t0 = Instant::now();
        let left = Vec2::new(-5.0, 0.0);
        let right = Vec2::new(5.0, 0.0);

        c.pointer_down(1, left, t0, &Neighbours);
        c.pointer_up(1, left, t0 + ms(40));
        c.pointer_down(1, right, t0 + ms(120), &Neighbours);
        let out = messages(c.pointer_up(1, right, t0 + ms(160)));
        assert_eq!(
            out,
            vec![SurfaceMessage::NodeSelect {
                node_id: Some(NodeId::new("right"))
            }]
        );

        // The tap on the right node still opens its own pair.
        c.pointer_down(1, right, t0 + ms(240), &Neighbours);
        let out = messages(c.pointer_up(1, right, t0 + ms(280)));
        assert_eq!(
            out,
            vec![SurfaceMessage::NodeDoubleTap {
                node_id: NodeId::new("right")
            }]
        );
    }

    #[test]
    fn test_node_drag_moves_node_not_canvas() {
        let doc = doc();
        let mut c = GestureController::new(GestureConfig::default());
        let t0 = Instant::now();
        // Grab the node 10px right of its center.
        c.pointer_down(1, Vec2::new(10.0, 0.0), t0, &doc);
        let out = messages(c.pointer_move(1, Vec2::new(60.0, 0.0), t0 + ms(30)));
        assert_eq!(
            out,
            vec![SurfaceMessage::NodeMove {
                node_id: NodeId::new("n"),
                x: 50.0,
                y: 0.0
            }]
        );
        assert!(c.is_dragging_node());
        let out = messages(c.pointer_move(1, Vec2::new(60.0, 40.0), t0 + ms(60)));
        assert_eq!(
            out,
            vec![SurfaceMessage::NodeMove {
                node_id: NodeId::new("n"),
                x: 50.0,
                y: 40.0
            }]
        );
        assert!(c.pointer_up(1, Vec2::new(60.0, 40.0), t0 + ms(90)).is_empty());
        assert_eq!(c.view(), ViewTransform::default());
    }

    #[test]
    fn test_canvas_drag_pans() {
        let doc = doc();
        let mut c = GestureController::new(GestureConfig::default());
        let t0 = Instant::now();
        let start = Vec2::new(300.0, 300.0);
        c.pointer_down(1, start, t0, &doc);
        let out = c.pointer_move(1, Vec2::new(330.0, 310.0), t0 + ms(20));
        assert_eq!(
            out,
            vec![GestureIntent::View(ViewTransform::new(1.0, Vec2::new(30.0, 10.0)))]
        );
        c.pointer_move(1, Vec2::new(340.0, 310.0), t0 + ms(40));
        assert_eq!(c.view().pan, Vec2::new(40.0, 10.0));
        assert!(c.pointer_up(1, Vec2::new(340.0, 310.0), t0 + ms(60)).is_empty());
    }

    #[test]
    fn test_single_finger_pan_disabled_when_two_pointers_required() {
        let doc = doc();
        let config = GestureConfig {
            pan_min_pointers: 2,
            ..Default::default()
        };
        let mut c = GestureController::new(config);
        let t0 = Instant::now();
        c.pointer_down(1, Vec2::new(300.0, 300.0), t0, &doc);
        assert!(c.pointer_move(1, Vec2::new(350.0, 300.0), t0 + ms(20)).is_empty());
        assert!(c.pointer_up(1, Vec2::new(350.0, 300.0), t0 + ms(40)).is_empty());
        assert_eq!(c.view(), ViewTransform::default());
    }

    #[test]
    fn test_pinch_zooms_about_focal_point_and_suppresses_taps() {
        let doc = doc();
        let mut c = GestureController::new(GestureConfig::default());
        let t0 = Instant::now();
        let a = Vec2::new(200.0, 200.0);
        let b = Vec2::new(300.0, 200.0);
        let focal = Vec2::new(250.0, 200.0);
        let under_fingers = c.view().screen_to_canvas(focal);

        c.pointer_down(1, a, t0, &doc);
        c.pointer_down(2, b, t0 + ms(10), &doc);
        let out = c.pointer_move(2, Vec2::new(400.0, 200.0), t0 + ms(30));
        assert_eq!(out.len(), 1);
        // Fingers spread from 100px to 200px, focal moved to x=300.
        assert!((c.view().zoom - 2.0).abs() < 1e-9);
        let new_focal = Vec2::new(300.0, 200.0);
        let now_under = c.view().screen_to_canvas(new_focal);
        assert!(now_under.distance(under_fingers) < 1e-9);

        c.pointer_move(2, Vec2::new(5000.0, 200.0), t0 + ms(50));
        assert_eq!(c.view().zoom, GestureConfig::default().max_zoom);

        assert!(messages(c.pointer_up(2, Vec2::new(5000.0, 200.0), t0 + ms(60))).is_empty());
        assert!(messages(c.pointer_up(1, a, t0 + ms(70))).is_empty());
        assert_eq!(c.active_pointers(), 0);

        // The next interaction starts clean.
        c.pointer_down(1, Vec2::ZERO, t0 + ms(500), &doc);
        let out = messages(c.pointer_up(1, Vec2::ZERO, t0 + ms(540)));
        assert!(matches!(out.as_slice(), [SurfaceMessage::NodeSelect { .. }]));
    }

    #[test]
    fn test_long_press_on_node_opens_context_menu() {
        let doc = doc();
        let mut c = GestureController::new(GestureConfig::default());
        let t0 = Instant::now();
        c.pointer_down(1, Vec2::new(5.0, 5.0), t0, &doc);
        assert!(c.poll(t0 + ms(200)).is_empty());
        let out = messages(c.poll(t0 + ms(460)));
        assert_eq!(
            out,
            vec![SurfaceMessage::LongPress {
                node_id: NodeId::new("n"),
                x: 5.0,
                y: 5.0
            }]
        );
        assert!(c.pointer_up(1, Vec2::new(5.0, 5.0), t0 + ms(600)).is_empty());

        // Long press on empty canvas has no outcome.
        c.pointer_down(1, Vec2::new(500.0, 500.0), t0 + ms(1000), &doc);
        assert!(c.poll(t0 + ms(1500)).is_empty());
    }

    #[test]
    fn test_zoom_steps_clamp() {
        let mut c = GestureController::new(GestureConfig::default());
        assert_eq!(c.zoom_steps(Vec2::ZERO, 1.0).len(), 1);
        assert!((c.view().zoom - 1.2).abs() < 1e-9);
        c.zoom_steps(Vec2::ZERO, 100.0);
        assert_eq!(c.view().zoom, 4.0);
        assert!(c.zoom_steps(Vec2::ZERO, 1.0).is_empty());
    }
}
