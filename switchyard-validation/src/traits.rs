// Validation traits

use crate::{RuleSet, ValidationErrors};
use serde::Serialize;

/// Types that can check themselves.
///
/// Implement it by hand for custom logic, or implement [`Rules`] and get
/// this trait for free.
pub trait Validate {
    /// Every violation found, or `Ok(())`.
    fn validate(&self) -> Result<(), ValidationErrors>;
}

/// Declarative constraints for a serializable type.
///
/// ```
/// use serde::Serialize;
/// use switchyard_validation::{Rules, RuleSet, Validate};
///
/// #[derive(Serialize)]
/// struct NewUser {
///     name: String,
///     email: String,
/// }
///
/// impl Rules for NewUser {
///     fn rules() -> RuleSet {
///         RuleSet::new()
///             .tags("name", "required,min=2").unwrap()
///             .tags("email", "required,email").unwrap()
///     }
/// }
///
/// let user = NewUser { name: "Ada".into(), email: "ada@example.com".into() };
/// assert!(user.validate().is_ok());
/// ```
pub trait Rules: Serialize {
    fn rules() -> RuleSet;
}

impl<T: Rules> Validate for T {
    fn validate(&self) -> Result<(), ValidationErrors> {
        T::rules().validate(self)
    }
}
