use ui_scrape::registrar::NoopRegistrar;
use ui_scrape::session::context::ScreenEvent;
use ui_scrape::session::engine::{EngineConfig, ScrapeEngine};
use ui_scrape::store::sqlite::SqliteStore;
use ui_scrape::tree::dump::NodeDump;

use super::fake_tree::FakeSpec;

pub const APP: &str = "com.example.shop";

/// FrameLayout > [Button "Login", EditText id=email]
pub fn login_spec() -> FakeSpec {
    FakeSpec::new("android.widget.FrameLayout")
        .child(FakeSpec::new("android.widget.Button").text("Login").clickable())
        .child(
            FakeSpec::new("android.widget.EditText")
                .id("com.example.shop:id/email")
                .editable(),
        )
}

/// Same screen as [`login_spec`], as a serialized dump.
pub fn login_dump() -> NodeDump {
    NodeDump::new("android.widget.FrameLayout")
        .with_child(NodeDump::new("android.widget.Button").with_text("Login").clickable())
        .with_child(
            NodeDump::new("android.widget.EditText")
                .with_resource_id("com.example.shop:id/email")
                .editable(),
        )
}

pub fn login_event(at_ms: i64) -> ScreenEvent {
    ScreenEvent::new(APP, "com.example.shop.LoginActivity", at_ms).with_title("Sign in")
}

pub fn memory_engine() -> ScrapeEngine<SqliteStore, NoopRegistrar> {
    ScrapeEngine::new(
        SqliteStore::in_memory().unwrap(),
        NoopRegistrar,
        EngineConfig::default(),
    )
}
