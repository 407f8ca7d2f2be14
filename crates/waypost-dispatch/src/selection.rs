//! Resolving a requested action name to one action.
//!
//! ```text
//! requested name
//!   → aliased actions whose name selectors all accept it
//!   ∪ non-aliased actions whose method name matches (case-insensitive)
//!   → selection filters: every method selector must accept the request;
//!     if any candidate carries method selectors, only those are eligible
//!   → 0: None · 1: the action · >1: SelectionError::Ambiguous
//! ```

use std::sync::Arc;

use tracing::{debug, warn};

use crate::context::ControllerContext;
use crate::descriptor::{short_type_name, ActionDescriptor, ControllerDescriptor};
use crate::error::SelectionError;

pub(crate) fn find_action(
    ctx: &ControllerContext,
    controller: &ControllerDescriptor,
    action_name: &str,
) -> Result<Option<Arc<ActionDescriptor>>, SelectionError> {
    let matching_name: Vec<&Arc<ActionDescriptor>> = controller
        .actions()
        .iter()
        .filter(|action| {
            if action.is_aliased() {
                action
                    .name_selectors()
                    .iter()
                    .all(|s| s.is_valid_name(ctx, action_name, action))
            } else {
                action.method_name().eq_ignore_ascii_case(action_name)
            }
        })
        .collect();

    let mut candidates = run_selection_filters(ctx, matching_name);
    match candidates.len() {
        0 => {
            debug!(
                controller = controller.controller_name(),
                action = action_name,
                "no action matched"
            );
            Ok(None)
        }
        1 => {
            let action = candidates.remove(0).clone();
            debug!(
                controller = controller.controller_name(),
                action = action_name,
                method = action.method_name(),
                "action selected"
            );
            Ok(Some(action))
        }
        _ => {
            let candidates: Vec<String> = candidates
                .iter()
                .map(|a| {
                    format!(
                        "{} on type {}",
                        a.signature(),
                        short_type_name(a.controller_type())
                    )
                })
                .collect();
            warn!(
                controller = controller.controller_name(),
                action = action_name,
                candidates = candidates.len(),
                "ambiguous action"
            );
            Err(SelectionError::Ambiguous {
                action: action_name.to_string(),
                controller: short_type_name(controller.type_name()),
                candidates,
            })
        }
    }
}

fn run_selection_filters<'a>(
    ctx: &ControllerContext,
    candidates: Vec<&'a Arc<ActionDescriptor>>,
) -> Vec<&'a Arc<ActionDescriptor>> {
    let mut with_selectors = Vec::new();
    let mut without_selectors = Vec::new();
    for action in candidates {
        let selectors = action.method_selectors();
        if selectors.is_empty() {
            without_selectors.push(action);
        } else if selectors
            .iter()
            .all(|s| s.is_valid_for_request(ctx, action))
        {
            with_selectors.push(action);
        }
    }
    if with_selectors.is_empty() {
        without_selectors
    } else {
        with_selectors
    }
}
