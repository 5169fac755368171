//! Injection adapter: write text into the platform's compose surface so the
//! host page's own reactivity sees genuine user input.

use tracing::debug;

use crate::dom::PageSnapshot;
use crate::driver::{DriverError, PageDriver};
use crate::platform::PlatformStrategy;

/// Insert `text` into the compose surface. `Ok(true)` means the host page
/// most likely accepted the input; `Ok(false)` means no compose surface was
/// usable and the page is untouched.
pub async fn insert_text(
    driver: &dyn PageDriver,
    page: &PageSnapshot,
    strategy: &dyn PlatformStrategy,
    text: &str,
) -> Result<bool, DriverError> {
    let Some(target) = strategy.locate_compose(page) else {
        debug!(platform = %strategy.platform(), "no compose surface located");
        return Ok(false);
    };

    driver.focus(target).await?;

    // Preferred path: a caret insertion routed through the host page's own
    // input pipeline, indistinguishable from typing.
    if driver.insert_text_at_caret(target, text).await? {
        debug!(node = target, chars = text.chars().count(), "inserted at caret");
        return Ok(true);
    }

    // The caret mechanism is unavailable. Only conventional form fields
    // have a native-setter fallback; a plain value assignment without the
    // synthetic input notification would leave the host page's state stale,
    // so anything else is a clean refusal.
    let is_form_field = page
        .node(target)
        .is_some_and(|n| matches!(n.tag_name.as_str(), "input" | "textarea"));
    if !is_form_field {
        debug!(node = target, "caret insertion unavailable on non-form surface");
        return Ok(false);
    }

    driver.set_field_value(target, text).await?;
    debug!(node = target, "set field value with synthetic input event");
    Ok(true)
}

#[cfg(test)]
#[path = "inject_tests.rs"]
mod tests;
