use crate::scrape::model::ObservedNode;
use crate::screen::classifier::{infer_validation, label_for};
use crate::screen::screen_model::{FormContext, FormIntent, IntentSignal, ValidationTag};

const CONTEXTS: [FormContext; 7] = [
    FormContext::Authentication,
    FormContext::Registration,
    FormContext::Payment,
    FormContext::Address,
    FormContext::Contact,
    FormContext::Search,
    FormContext::Feedback,
];

/// (keyword in field text/id, context, weight)
const FIELD_KEYWORDS: &[(&str, FormContext, f32)] = &[
    ("card", FormContext::Payment, 0.4),
    ("cvv", FormContext::Payment, 0.4),
    ("expiry", FormContext::Payment, 0.3),
    ("address", FormContext::Address, 0.4),
    ("street", FormContext::Address, 0.3),
    ("city", FormContext::Address, 0.3),
    ("zip", FormContext::Address, 0.3),
    ("postal", FormContext::Address, 0.3),
    ("message", FormContext::Contact, 0.3),
    ("feedback", FormContext::Feedback, 0.5),
    ("comment", FormContext::Feedback, 0.4),
    ("rating", FormContext::Feedback, 0.3),
    ("confirm", FormContext::Registration, 0.3),
];

/// (phrase in action label, context, weight)
const ACTION_KEYWORDS: &[(&str, FormContext, f32)] = &[
    ("sign in", FormContext::Authentication, 0.4),
    ("log in", FormContext::Authentication, 0.4),
    ("login", FormContext::Authentication, 0.4),
    ("sign up", FormContext::Registration, 0.5),
    ("register", FormContext::Registration, 0.5),
    ("create account", FormContext::Registration, 0.5),
    ("pay", FormContext::Payment, 0.4),
    ("place order", FormContext::Payment, 0.4),
    ("checkout", FormContext::Payment, 0.4),
    ("search", FormContext::Search, 0.4),
    ("send", FormContext::Contact, 0.2),
    ("submit feedback", FormContext::Feedback, 0.3),
];

/// Score what the editable fields on a screen are for.
pub fn infer_form_intent(nodes: &[ObservedNode]) -> FormIntent {
    let fields: Vec<&ObservedNode> = nodes.iter().filter(|n| n.editable).collect();

    if fields.is_empty() {
        return FormIntent {
            context: FormContext::None,
            confidence: 0.0,
            signals: vec![],
        };
    }

    let mut scores = [0.0f32; CONTEXTS.len()];
    let mut signals = Vec::new();
    let mut bump = |context: FormContext, weight: f32| {
        if let Some(i) = CONTEXTS.iter().position(|c| *c == context) {
            scores[i] += weight;
        }
    };

    for field in &fields {
        if let Some(tag) = infer_validation(field) {
            signals.push(IntentSignal::InputType(tag));
            match tag {
                ValidationTag::Password => {
                    bump(FormContext::Authentication, 0.4);
                    bump(FormContext::Registration, 0.2);
                }
                ValidationTag::Email => {
                    bump(FormContext::Authentication, 0.2);
                    bump(FormContext::Registration, 0.2);
                    bump(FormContext::Contact, 0.2);
                }
                ValidationTag::Name => {
                    bump(FormContext::Registration, 0.3);
                    bump(FormContext::Contact, 0.2);
                }
                ValidationTag::Phone => bump(FormContext::Contact, 0.3),
                ValidationTag::Search => bump(FormContext::Search, 0.8),
                ValidationTag::Number | ValidationTag::Url | ValidationTag::Date => {}
            }
        }

        let haystack = field_haystack(field);
        for (keyword, context, weight) in FIELD_KEYWORDS {
            if haystack.contains(keyword) {
                signals.push(IntentSignal::Keyword((*keyword).to_string()));
                bump(*context, *weight);
            }
        }
    }

    for action in nodes.iter().filter(|n| n.clickable && !n.editable) {
        let Some(label) = label_for(action) else {
            continue;
        };
        let lower = label.to_lowercase();
        for (phrase, context, weight) in ACTION_KEYWORDS {
            if lower.contains(phrase) {
                signals.push(IntentSignal::ActionLabel(label.clone()));
                bump(*context, *weight);
            }
        }
    }

    let (best, score) = CONTEXTS
        .iter()
        .zip(scores)
        .fold((FormContext::Unknown, 0.0f32), |acc, (context, score)| {
            if score > acc.1 { (*context, score) } else { acc }
        });

    let context = if score >= 0.4 { best } else { FormContext::Unknown };

    FormIntent {
        context,
        confidence: score.clamp(0.0, 1.0),
        signals,
    }
}

fn field_haystack(node: &ObservedNode) -> String {
    [
        node.resource_id.as_deref(),
        node.text.as_deref(),
        node.description.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase()
}
