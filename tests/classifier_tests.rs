use ui_scrape::fingerprint::ScreenSignature;
use ui_scrape::scrape::cancel::CancelToken;
use ui_scrape::scrape::dedup::MemoryResolver;
use ui_scrape::scrape::model::{WalkLimits, WalkOutcome};
use ui_scrape::scrape::walker::walk;
use ui_scrape::screen::classifier::{annotate_elements, classify_screen, infer_validation};
use ui_scrape::screen::intent::infer_form_intent;
use ui_scrape::screen::screen_model::{
    FormContext, IntentSignal, ScreenContext, ScreenType, ValidationTag,
};
use ui_scrape::store::model::ElementId;

use crate::common::fake_tree::{FakeSpec, FakeTree};

mod common;

// =========================================================================
// Helpers
// =========================================================================

fn observe(spec: FakeSpec) -> WalkOutcome {
    let tree = FakeTree::new(spec);
    walk(tree.root(), "com.app", &MemoryResolver::new(), &WalkLimits::default(), &CancelToken::detached())
        .unwrap()
}

fn field(id: &str) -> FakeSpec {
    FakeSpec::new("android.widget.EditText").id(&format!("com.app:id/{id}")).editable()
}

fn button(label: &str) -> FakeSpec {
    FakeSpec::new("android.widget.Button").text(label).clickable()
}

fn screen(activity: &str, title: Option<&str>) -> ScreenSignature {
    ScreenSignature::new("com.app", activity, title)
}

fn login_form() -> FakeSpec {
    FakeSpec::new("android.widget.FrameLayout").child(
        FakeSpec::new("android.widget.LinearLayout")
            .child(field("email"))
            .child(field("password"))
            .child(button("Sign in")),
    )
}

// =========================================================================
// Form intent
// =========================================================================

#[test]
fn login_fields_infer_authentication() {
    let out = observe(login_form());
    let intent = infer_form_intent(&out.observed);

    assert_eq!(intent.context, FormContext::Authentication);
    assert!(intent.confidence > 0.4 && intent.confidence <= 1.0);
    assert!(intent.signals.contains(&IntentSignal::InputType(ValidationTag::Password)));
    assert!(intent.signals.contains(&IntentSignal::ActionLabel("Sign in".into())));
}

#[test]
fn registration_outscores_login() {
    let out = observe(
        FakeSpec::new("android.widget.LinearLayout")
            .child(field("full_name"))
            .child(field("email"))
            .child(field("password"))
            .child(field("confirm_password"))
            .child(button("Register")),
    );

    assert_eq!(infer_form_intent(&out.observed).context, FormContext::Registration);
}

#[test]
fn search_box_infers_search() {
    let out = observe(
        FakeSpec::new("android.widget.LinearLayout")
            .child(field("search_query"))
            .child(button("Go")),
    );

    assert_eq!(infer_form_intent(&out.observed).context, FormContext::Search);
}

#[test]
fn no_fields_means_no_form() {
    let out = observe(FakeSpec::new("android.widget.LinearLayout").child(button("Continue")));
    let intent = infer_form_intent(&out.observed);

    assert_eq!(intent.context, FormContext::None);
    assert_eq!(intent.confidence, 0.0);
    assert!(intent.signals.is_empty());
}

#[test]
fn weak_signals_stay_unknown() {
    let out = observe(
        FakeSpec::new("android.widget.LinearLayout")
            .child(field("field_a"))
            .child(field("field_b")),
    );

    assert_eq!(infer_form_intent(&out.observed).context, FormContext::Unknown);
}

// =========================================================================
// Screen classification
// =========================================================================

#[test]
fn login_screen_classification() {
    let out = observe(login_form());
    let context = classify_screen(&screen("com.app.EntryActivity", None), &out.observed, 2);

    assert_eq!(
        context,
        ScreenContext {
            screen_type: ScreenType::Login,
            form_context: FormContext::Authentication,
            primary_action: Some("Sign in".into()),
            navigation_level: 2,
        }
    );
}

#[test]
fn dialog_wins_over_everything() {
    let out = observe(login_form());
    let context = classify_screen(&screen("com.app.ConfirmDialog", None), &out.observed, 0);
    assert_eq!(context.screen_type, ScreenType::Dialog);
    assert_eq!(context.form_context, FormContext::Authentication);
}

#[test]
fn activity_and_title_keywords() {
    let out = observe(FakeSpec::new("android.widget.TextView").text("Dark mode"));

    let by_activity = classify_screen(&screen("com.app.SettingsActivity", None), &out.observed, 0);
    assert_eq!(by_activity.screen_type, ScreenType::Settings);

    let by_title = classify_screen(&screen("com.app.HostActivity", Some("My Profile")), &out.observed, 0);
    assert_eq!(by_title.screen_type, ScreenType::Profile);
}

#[test]
fn list_container_with_rows() {
    let out = observe(
        FakeSpec::new("androidx.recyclerview.widget.RecyclerView").children(
            ["Apples", "Pears", "Plums"]
                .into_iter()
                .map(|t| FakeSpec::new("android.widget.TextView").text(t)),
        ),
    );

    let context = classify_screen(&screen("com.app.FeedActivity", Some("Fruit")), &out.observed, 1);
    assert_eq!(context.screen_type, ScreenType::List);
    assert_eq!(context.form_context, FormContext::None);
    assert_eq!(context.primary_action, None);
}

#[test]
fn list_needs_three_rows_under_the_list_itself() {
    // Three rows under a plain layout, only two under the list.
    let out = observe(
        FakeSpec::new("android.widget.LinearLayout")
            .child(
                FakeSpec::new("android.widget.ListView")
                    .child(FakeSpec::new("android.widget.TextView").text("one"))
                    .child(FakeSpec::new("android.widget.TextView").text("two")),
            )
            .child(FakeSpec::new("android.widget.TextView").text("a"))
            .child(FakeSpec::new("android.widget.TextView").text("b")),
    );

    let context = classify_screen(&screen("com.app.HostActivity", None), &out.observed, 0);
    assert_ne!(context.screen_type, ScreenType::List);
}

#[test]
fn long_list_is_classified() {
    let tree = FakeTree::new(
        FakeSpec::new("androidx.recyclerview.widget.RecyclerView").children(
            (0..20_000).map(|i| FakeSpec::new("android.widget.TextView").text(&format!("row {i}"))),
        ),
    );
    let limits = WalkLimits { max_nodes: 25_000, ..WalkLimits::default() };
    let out = walk(tree.root(), "com.app", &MemoryResolver::new(), &limits, &CancelToken::detached())
        .unwrap();

    assert_eq!(out.observed.len(), 20_001);
    let context = classify_screen(&screen("com.app.FeedActivity", None), &out.observed, 0);
    assert_eq!(context.screen_type, ScreenType::List);
}

#[test]
fn generic_form_and_unknown() {
    let form = observe(
        FakeSpec::new("android.widget.LinearLayout")
            .child(field("field_a"))
            .child(field("field_b")),
    );
    assert_eq!(
        classify_screen(&screen("com.app.XActivity", None), &form.observed, 0).screen_type,
        ScreenType::Form
    );

    let plain = observe(FakeSpec::new("android.widget.TextView").text("Hello"));
    assert_eq!(
        classify_screen(&screen("com.app.XActivity", None), &plain.observed, 0).screen_type,
        ScreenType::Unknown
    );
}

#[test]
fn primary_action_matches_whole_words() {
    let out = observe(
        FakeSpec::new("android.widget.LinearLayout")
            .child(button("Logistics"))
            .child(button("Save changes")),
    );

    let context = classify_screen(&screen("com.app.XActivity", None), &out.observed, 0);
    assert_eq!(context.primary_action.as_deref(), Some("Save changes"));
}

// =========================================================================
// Validation tags
// =========================================================================

#[test]
fn validation_tags_from_ids() {
    let out = observe(
        FakeSpec::new("android.widget.LinearLayout")
            .child(field("email"))
            .child(field("phone_number"))
            .child(field("user_age"))
            .child(field("message_body"))
            .child(field("website"))
            .child(FakeSpec::new("android.widget.TextView").id("com.app:id/email_label")),
    );

    let tags: Vec<Option<ValidationTag>> = out.observed[1..].iter().map(infer_validation).collect();
    assert_eq!(
        tags,
        vec![
            Some(ValidationTag::Email),
            Some(ValidationTag::Phone),
            Some(ValidationTag::Number),
            None,
            Some(ValidationTag::Url),
            None,
        ]
    );
}

#[test]
fn labels_round_trip_through_parse() {
    for screen_type in [ScreenType::Login, ScreenType::Checkout, ScreenType::Unknown] {
        assert_eq!(ScreenType::parse(screen_type.as_str()), Some(screen_type));
    }
    assert_eq!(FormContext::parse("nonsense"), None);
}

// =========================================================================
// Element annotation
// =========================================================================

#[test]
fn form_fields_and_submit_share_a_group() {
    let mut out = observe(login_form());
    annotate_elements(&mut out);

    let groups: Vec<Option<&str>> = out.elements.iter().map(|e| e.form_group.as_deref()).collect();
    let expected = format!("form:{}", &out.elements[1].hash.as_str()[..12]);

    assert_eq!(groups[0], None, "outer frame");
    assert_eq!(groups[1], None, "group root itself");
    assert_eq!(groups[2], Some(expected.as_str()));
    assert_eq!(groups[3], Some(expected.as_str()));
    assert_eq!(groups[4], Some(expected.as_str()), "submit button joins the form");

    assert_eq!(out.elements[2].validation, Some(ValidationTag::Email));
    assert_eq!(out.elements[3].validation, Some(ValidationTag::Password));
    assert_eq!(out.elements[4].validation, None);
}

#[test]
fn cached_elements_are_not_annotated() {
    let probe = observe(login_form());
    let mut resolver = MemoryResolver::new();
    resolver.insert("com.app", probe.elements[2].hash.clone(), ElementId(5));

    let tree = FakeTree::new(login_form());
    let mut out = walk(tree.root(), "com.app", &resolver, &WalkLimits::default(), &CancelToken::detached())
        .unwrap();
    annotate_elements(&mut out);

    assert_eq!(out.elements.len(), 4);
    assert!(out.elements.iter().all(|e| e.hash != probe.elements[2].hash));
    assert_eq!(out.elements[2].validation, Some(ValidationTag::Password));
    assert!(out.elements[2].form_group.is_some());
}
