//! Operation framework
//!
//! Every request the client can send is a type implementing
//! [`PlayerOperation`]: it names its action, contributes any extra form
//! fields and knows how to turn a successful [`Reply`] into its typed
//! response. Rejections are handled centrally by the client, so
//! `parse_response` only ever sees replies with the success code.

use crate::codec::{self, Reply};
use crate::Result;
use std::borrow::Cow;

/// Base trait for all player operations
pub trait PlayerOperation {
    /// Typed result of a successful exchange
    type Response;

    /// Action name without the `cCMD_` prefix (for example `PST` or `RC_STOP`)
    fn action(&self) -> Cow<'static, str>;

    /// Form fields appended after the image-button pair
    fn form_fields(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    /// Build the full request body
    fn build_payload(&self) -> String {
        let mut body = codec::image_button(&self.action());
        for (name, value) in self.form_fields() {
            codec::append_field(&mut body, name, &value);
        }
        body
    }

    /// Convert a success reply into the typed response
    ///
    /// Missing or malformed fields must surface as [`crate::ApiError::Decode`],
    /// never as a default value.
    fn parse_response(&self, reply: &Reply) -> Result<Self::Response>;
}
