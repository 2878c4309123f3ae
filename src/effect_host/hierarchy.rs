//! Parameter Hierarchy Builder
//!
//! Runs once after all of an effect's parameters exist. Two passes:
//! explicit group parenting first, then declarative page membership. Page
//! membership is by name and must not override a group claim already made,
//! hence the ordering. A malformed plugin (unknown parent, non-group
//! parent, missing page child) is logged and skipped, never fatal.

use super::descriptor::{LayoutHint, ParamKind};
use super::params::{ParamInstance, ParentEdge};
use crate::knob::{add_child, Knob, SharedKnob};
use std::collections::HashMap;
use tracing::warn;

fn find_knob<'a>(knobs: &'a [SharedKnob], name: &str) -> Option<&'a SharedKnob> {
    knobs.iter().find(|k| k.lock().unwrap().name() == name)
}

/// Append a `<name>_separator` knob to the container unless one already
/// exists among the effect's knobs
fn append_separator(container: &SharedKnob, after: &str, knobs: &mut Vec<SharedKnob>) {
    let separator_name = format!("{}_separator", after);
    if find_knob(knobs, &separator_name).is_some() {
        return;
    }
    let separator = Knob::separator(&separator_name);
    if add_child(container, &separator) {
        knobs.push(separator);
    }
}

/// Resolve the parent edges recorded during construction into the knob
/// tree. The edge list is consumed; running again on a resolved set is a
/// no-op.
pub fn attach_to_parents(
    params: &[ParamInstance],
    edges: Vec<ParentEdge>,
    knobs: &mut Vec<SharedKnob>,
) {
    let by_name: HashMap<&str, &ParamInstance> =
        params.iter().map(|p| (p.name(), p)).collect();
    let edge_map: HashMap<String, String> = edges
        .into_iter()
        .map(|edge| (edge.param, edge.parent))
        .collect();

    // Pass 1: explicit group parenting for everything that is not a page.
    for param in params.iter().filter(|p| !p.is_page()) {
        let Some(parent_name) = edge_map.get(param.name()) else {
            continue;
        };
        let parent = match by_name.get(parent_name.as_str()) {
            Some(parent) => *parent,
            None => {
                warn!(
                    param = param.name(),
                    parent = parent_name.as_str(),
                    "parameter declares an unknown parent"
                );
                continue;
            }
        };
        if !parent.is_group() {
            warn!(
                param = param.name(),
                parent = parent_name.as_str(),
                "attempting to parent a parameter to a non-group"
            );
            continue;
        }
        if add_child(parent.knob(), param.knob())
            && param.layout_hint() == LayoutHint::TrailingSeparator
        {
            append_separator(parent.knob(), param.name(), knobs);
        }
    }

    // Pass 2: declarative page membership for knobs no group claimed.
    for page in params.iter().filter(|p| p.is_page()) {
        let ParamKind::Page { children } = &page.descriptor().kind else {
            continue;
        };
        for child_name in children {
            let Some(child) = find_knob(knobs, child_name).cloned() else {
                warn!(
                    child = child_name.as_str(),
                    page = page.name(),
                    "page lists a child that is not a known parameter"
                );
                continue;
            };
            let (unparented, wants_separator) = {
                let child = child.lock().unwrap();
                (child.parent().is_none(), child.separator_requested())
            };
            if unparented && add_child(page.knob(), &child) && wants_separator {
                append_separator(page.knob(), child_name, knobs);
            }
        }
    }
}
