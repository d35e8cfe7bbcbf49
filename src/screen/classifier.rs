use std::collections::HashSet;

use crate::fingerprint::{ScreenSignature, simple_class_name};
use crate::scrape::model::{NodeRef, ObservedNode, WalkOutcome};
use crate::screen::intent::infer_form_intent;
use crate::screen::screen_model::{FormContext, ScreenContext, ScreenType, ValidationTag};

const PRIMARY_ACTION_KEYWORDS: [&str; 13] = [
    "submit", "save", "sign", "login", "log", "continue", "next", "send", "done", "confirm",
    "pay", "search", "register",
];

/// (keyword in activity or title, screen type), checked in order.
const SCREEN_KEYWORDS: &[(&str, ScreenType)] = &[
    ("login", ScreenType::Login),
    ("signin", ScreenType::Login),
    ("sign in", ScreenType::Login),
    ("register", ScreenType::Registration),
    ("signup", ScreenType::Registration),
    ("sign up", ScreenType::Registration),
    ("checkout", ScreenType::Checkout),
    ("payment", ScreenType::Checkout),
    ("cart", ScreenType::Checkout),
    ("settings", ScreenType::Settings),
    ("preferences", ScreenType::Settings),
    ("search", ScreenType::Search),
    ("profile", ScreenType::Profile),
    ("account", ScreenType::Profile),
    ("detail", ScreenType::Detail),
    ("home", ScreenType::Home),
    ("main", ScreenType::Home),
];

const LIST_CLASSES: [&str; 4] = ["RecyclerView", "ListView", "GridView", "ViewPager"];

// ============================================================================
// Screen classification
// ============================================================================

/// Classify a screen from its window fields and the nodes observed on it.
pub fn classify_screen(
    sig: &ScreenSignature,
    nodes: &[ObservedNode],
    navigation_level: u32,
) -> ScreenContext {
    let intent = infer_form_intent(nodes);

    ScreenContext {
        screen_type: detect_screen_type(sig, nodes, intent.context),
        form_context: intent.context,
        primary_action: detect_primary_action(nodes),
        navigation_level,
    }
}

fn detect_screen_type(sig: &ScreenSignature, nodes: &[ObservedNode], form: FormContext) -> ScreenType {
    let activity = simple_class_name(&sig.activity).to_lowercase();

    if activity.contains("dialog")
        || nodes
            .first()
            .is_some_and(|root| simple_class_name(&root.class_name).contains("Dialog"))
    {
        return ScreenType::Dialog;
    }

    match form {
        FormContext::Authentication => return ScreenType::Login,
        FormContext::Registration => return ScreenType::Registration,
        FormContext::Payment => return ScreenType::Checkout,
        FormContext::Search => return ScreenType::Search,
        _ => {}
    }

    let title = sig.title.as_deref().unwrap_or("").to_lowercase();
    for (keyword, screen_type) in SCREEN_KEYWORDS {
        if activity.contains(keyword) || title.contains(keyword) {
            return *screen_type;
        }
    }

    if has_list(nodes) {
        return ScreenType::List;
    }

    if nodes.iter().filter(|n| n.editable).count() >= 2 {
        return ScreenType::Form;
    }

    ScreenType::Unknown
}

/// A list container with at least three direct children.
fn has_list(nodes: &[ObservedNode]) -> bool {
    let mut child_counts = vec![0usize; nodes.len()];
    for parent in nodes.iter().filter_map(|n| n.parent) {
        if let Some(count) = child_counts.get_mut(parent) {
            *count += 1;
        }
    }

    nodes.iter().zip(&child_counts).any(|(node, count)| {
        *count >= 3 && LIST_CLASSES.contains(&simple_class_name(&node.class_name))
    })
}

fn detect_primary_action(nodes: &[ObservedNode]) -> Option<String> {
    nodes
        .iter()
        .filter(|n| n.clickable && !n.editable)
        .filter_map(label_for)
        .find(|label| {
            let lower = label.to_lowercase();
            lower
                .split(|c: char| !c.is_alphanumeric())
                .any(|word| PRIMARY_ACTION_KEYWORDS.contains(&word))
        })
}

/// Visible label: text, falling back to the content description.
pub fn label_for(node: &ObservedNode) -> Option<String> {
    node.text.clone().or_else(|| node.description.clone())
}

// ============================================================================
// Element annotation
// ============================================================================

/// Guess the expected content of an editable field from its id and hints.
pub fn infer_validation(node: &ObservedNode) -> Option<ValidationTag> {
    if !node.editable {
        return None;
    }

    let hints = [
        node.resource_id.as_deref(),
        node.text.as_deref(),
        node.description.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase();
    let words: Vec<&str> = hints
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    // Short keywords must match a whole word ("age" is not "message").
    let mentions = |keyword: &str| {
        words
            .iter()
            .any(|w| *w == keyword || (keyword.len() >= 4 && w.contains(keyword)))
    };

    let rules: [(&[&str], ValidationTag); 8] = [
        (&["email"], ValidationTag::Email),
        (&["password", "passcode", "pin"], ValidationTag::Password),
        (&["phone", "mobile", "tel"], ValidationTag::Phone),
        (&["url", "website"], ValidationTag::Url),
        (&["date", "dob", "birthday"], ValidationTag::Date),
        (&["search", "query"], ValidationTag::Search),
        (&["amount", "quantity", "zip", "number", "age"], ValidationTag::Number),
        (&["name"], ValidationTag::Name),
    ];

    rules
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| mentions(*k)))
        .map(|(_, tag)| *tag)
}

/// Fill `validation` and `form_group` on the batch's new elements.
///
/// A form group is rooted at the nearest ancestor holding at least two
/// editable descendants (or the direct parent of a lone field). Editable
/// nodes and the clickable non-editable nodes under that root share the id
/// `form:<root hash prefix>`. Cached elements keep what the store has.
pub fn annotate_elements(outcome: &mut WalkOutcome) {
    let observed = &outcome.observed;

    // Pre-order: every parent precedes its children, so a reverse pass sums
    // editable descendants bottom-up.
    let mut editable_below = vec![0usize; observed.len()];
    for index in (0..observed.len()).rev() {
        let own = usize::from(observed[index].editable);
        let total = editable_below[index] + own;
        if let Some(parent) = observed[index].parent {
            editable_below[parent] += total;
        }
    }

    let group_root = |index: usize| -> Option<usize> {
        let mut cursor = observed[index].parent;
        let direct = cursor;
        while let Some(ancestor) = cursor {
            if editable_below[ancestor] >= 2 {
                return Some(ancestor);
            }
            cursor = observed[ancestor].parent;
        }
        direct
    };

    let mut roots = HashSet::new();
    let mut assignments: Vec<(usize, String)> = Vec::new();

    for (index, node) in observed.iter().enumerate() {
        if !node.editable {
            continue;
        }
        if let Some(root) = group_root(index) {
            roots.insert(root);
            assignments.push((index, group_id(&observed[root])));
        }
    }

    for (index, node) in observed.iter().enumerate() {
        if !node.clickable || node.editable {
            continue;
        }
        let mut cursor = node.parent;
        while let Some(ancestor) = cursor {
            if roots.contains(&ancestor) {
                assignments.push((index, group_id(&observed[ancestor])));
                break;
            }
            cursor = observed[ancestor].parent;
        }
    }

    let validations: Vec<(usize, Option<ValidationTag>)> = observed
        .iter()
        .enumerate()
        .filter(|(_, n)| n.editable)
        .map(|(i, n)| (i, infer_validation(n)))
        .collect();

    let element_index = |observed_index: usize| match outcome.observed[observed_index].node_ref {
        NodeRef::ListIndex(i) => Some(i),
        NodeRef::StoreId(_) => None,
    };

    let assignments: Vec<(usize, String)> = assignments
        .into_iter()
        .filter_map(|(o, group)| element_index(o).map(|e| (e, group)))
        .collect();
    let validations: Vec<(usize, ValidationTag)> = validations
        .into_iter()
        .filter_map(|(o, tag)| Some((element_index(o)?, tag?)))
        .collect();

    for (element, group) in assignments {
        if let Some(el) = outcome.elements.get_mut(element) {
            el.form_group.get_or_insert(group);
        }
    }
    for (element, tag) in validations {
        if let Some(el) = outcome.elements.get_mut(element) {
            el.validation = Some(tag);
        }
    }
}

fn group_id(root: &ObservedNode) -> String {
    let hex = root.hash.as_str();
    format!("form:{}", &hex[..hex.len().min(12)])
}
