//! Presentation surface driven by the session state machine.
//!
//! The Slint window implements [`SessionView`]; tests substitute a mock or a
//! recording fake. Every method is called on the UI thread only.

use crate::services::code_image::Bitmap;

/// Label of the action button while idle
pub const ACTION_LABEL: &str = "onionize";

/// Label of the action button while a request is outstanding
pub const BUSY_LABEL: &str = "onionizing...";

#[cfg_attr(test, mockall::automock)]
pub trait SessionView {
    /// Enable or disable every input control, the action button included.
    fn set_inputs_enabled(&self, enabled: bool);

    fn set_action_label(&self, label: &str);

    /// Replace the action button with the selected address and its QR code.
    fn show_published(&self, address: &str, image: &Bitmap);

    /// Open the modal error dialog.
    fn show_error(&self, message: &str);

    /// Close the modal error dialog.
    fn dismiss_error(&self);
}
