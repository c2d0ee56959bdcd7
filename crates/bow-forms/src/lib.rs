//! Form handling for bow applications.
//!
//! A [`Form`] wraps submitted values and collects one or more error messages
//! per field as validators run. Templates re-display both through its
//! serialized form.
//!
//! ```
//! use bow_forms::Form;
//!
//! let mut form = Form::from_pairs([("title", ""), ("email", "ada@example.com")]);
//! form.required(&["title", "email"]).is_email(&["email"]);
//!
//! assert!(!form.is_valid());
//! assert_eq!(form.error("title"), Some("This field cannot be blank"));
//! assert_eq!(form.error("email"), None);
//! ```

mod form;

pub use form::{
	Form, MSG_BLANK, MSG_INVALID, MSG_INVALID_DATE, MSG_INVALID_EMAIL, MSG_INVALID_INTEGER,
	MSG_INVALID_TIME,
};
