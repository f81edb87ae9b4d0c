//! Terminal anchors and orthogonal wire routing.
//!
//! Terminal positions are a pure function of a component's type and bbox.
//! Wires are routed as an L: one horizontal and one vertical segment, the
//! longer axis first. There is no collision avoidance.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{info, instrument, warn};

use tagtrace_shared::{
    Component, ComponentType, Point, RoutingConfig, TerminalAnchor, TerminalRef, VoltageClass,
    WirePath, WireSpec,
};

// ---------------------------------------------------------------------------
// Terminal layout
// ---------------------------------------------------------------------------

/// Terminal anchors of a component, indexed from 0.
///
/// | type | anchors |
/// |---|---|
/// | contactor, relay | coil upper/lower on the left, contact upper/lower on the right |
/// | sensors | two power terminals left, output right, centred as a group |
/// | power supply | top and bottom centre |
/// | motor | three along the top edge (U, V, W) |
/// | PLC I/O | `N` along the left edge, top down, `height / (N + 1)` apart; `N` is clamped to `1..=max_plc_channels` |
/// | other | left centre, right centre |
pub fn terminal_anchors(component: &Component, config: &RoutingConfig) -> Vec<TerminalAnchor> {
    let b = component.bbox;
    let inset = config.edge_inset_pt;
    let c = b.center();
    let (w, h) = (b.width(), b.height());
    let left = b.x0 + inset;
    let right = b.x1 - inset;

    let points: Vec<Point> = match component.kind {
        ComponentType::Contactor | ComponentType::Relay => {
            let upper = b.y1 - 0.25 * h;
            let lower = b.y0 + 0.25 * h;
            vec![
                Point::new(left, upper),
                Point::new(left, lower),
                Point::new(right, upper),
                Point::new(right, lower),
            ]
        }
        kind if kind.is_sensor() => {
            let half = config.sensor_pitch_pt / 2.0;
            vec![
                Point::new(left, c.y + half),
                Point::new(left, c.y - half),
                Point::new(right, c.y),
            ]
        }
        ComponentType::PowerSupply => {
            vec![Point::new(c.x, b.y1 - inset), Point::new(c.x, b.y0 + inset)]
        }
        ComponentType::Motor => (1..=3)
            .map(|i| Point::new(b.x0 + w * f64::from(i) / 4.0, b.y1 - inset))
            .collect(),
        ComponentType::PlcIo => {
            let declared = component.terminal_count.unwrap_or(config.default_plc_channels);
            let n = declared.clamp(1, config.max_plc_channels.max(1));
            if n != declared {
                warn!(
                    component = %component.id,
                    declared,
                    channels = n,
                    "PLC channel count out of range, clamped"
                );
            }
            let spacing = h / f64::from(n.saturating_add(1));
            (1..=n)
                .map(|i| Point::new(left, b.y1 - spacing * f64::from(i)))
                .collect()
        }
        _ => vec![Point::new(left, c.y), Point::new(right, c.y)],
    };

    points
        .into_iter()
        .enumerate()
        .map(|(index, position)| TerminalAnchor {
            component_id: component.id.clone(),
            index,
            position,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// L-shaped waypoints from `a` to `b`: horizontal first when
/// `|dx| >= |dy|`, vertical first otherwise. Always `[a, bend, b]`; for
/// aligned endpoints the bend coincides with one of them.
pub fn route_points(a: Point, b: Point) -> Vec<Point> {
    let bend = if (b.x - a.x).abs() >= (b.y - a.y).abs() {
        Point::new(b.x, a.y)
    } else {
        Point::new(a.x, b.y)
    };
    vec![a, bend, b]
}

/// Route a wire between two anchors.
pub fn route(from: &TerminalAnchor, to: &TerminalAnchor, voltage_class: VoltageClass) -> WirePath {
    WirePath {
        id: None,
        from_anchor: TerminalRef {
            component_id: from.component_id.clone(),
            index: from.index,
        },
        to_anchor: TerminalRef {
            component_id: to.component_id.clone(),
            index: to.index,
        },
        waypoints: route_points(from.position, to.position),
        voltage_class,
        resolved: true,
    }
}

/// Paths for a batch of wires, plus how many could not be anchored.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WireRouting {
    pub paths: Vec<WirePath>,
    pub unresolved: usize,
}

impl WireRouting {
    pub fn resolved(&self) -> impl Iterator<Item = &WirePath> {
        self.paths.iter().filter(|p| p.resolved)
    }
}

struct Placed {
    page: u32,
    anchors: Vec<TerminalAnchor>,
}

fn anchor_for<'a>(
    placed: &'a HashMap<&str, Placed>,
    terminal: &TerminalRef,
) -> Option<(u32, &'a TerminalAnchor)> {
    let p = placed.get(terminal.component_id.as_str())?;
    Some((p.page, p.anchors.get(terminal.index)?))
}

/// Route every wire between placed components.
///
/// A wire is unresolved (kept, no waypoints) when an endpoint's component is
/// not placed, the terminal index does not exist, or the two components sit
/// on different pages.
#[instrument(skip_all, fields(components = components.len(), wires = wires.len()))]
pub fn generate_wire_paths(
    components: &[Component],
    wires: &[WireSpec],
    config: &RoutingConfig,
) -> WireRouting {
    let referenced: HashSet<&str> = wires
        .iter()
        .flat_map(|w| [w.from.component_id.as_str(), w.to.component_id.as_str()])
        .collect();
    let placed: HashMap<&str, Placed> = components
        .iter()
        .filter(|c| referenced.contains(c.id.as_str()))
        .map(|c| {
            (
                c.id.as_str(),
                Placed {
                    page: c.page,
                    anchors: terminal_anchors(c, config),
                },
            )
        })
        .collect();

    let mut routing = WireRouting::default();
    for wire in wires {
        let voltage_class = wire.voltage_class();
        let path = match (anchor_for(&placed, &wire.from), anchor_for(&placed, &wire.to)) {
            (Some((from_page, from)), Some((to_page, to))) if from_page == to_page => {
                WirePath {
                    id: wire.id.clone(),
                    ..route(from, to, voltage_class)
                }
            }
            ends => {
                let reason = match ends {
                    (None, _) | (_, None) => "endpoint not placed",
                    _ => "endpoints on different pages",
                };
                warn!(
                    wire = wire.id.as_deref().unwrap_or("-"),
                    from = %wire.from.component_id,
                    to = %wire.to.component_id,
                    reason,
                    "unresolved wire"
                );
                routing.unresolved += 1;
                WirePath {
                    id: wire.id.clone(),
                    from_anchor: wire.from.clone(),
                    to_anchor: wire.to.clone(),
                    waypoints: Vec::new(),
                    voltage_class,
                    resolved: false,
                }
            }
        };
        routing.paths.push(path);
    }

    info!(
        routed = routing.paths.len() - routing.unresolved,
        unresolved = routing.unresolved,
        "wire routing completed"
    );
    routing
}
