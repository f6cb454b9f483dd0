//! Filtering Log Page Controllers
//!
//! Orchestration for the filtering log page: the [`LogViewController`] keeps
//! the per-tab event store and the rendered row projection in sync with
//! engine notifications, the [`RequestWizard`] turns a selected row into a
//! new filter rule, and [`LogPage`] owns the notification subscription for
//! the lifetime of an open page.
//!
//! Rendering and every engine-side operation are reached through the traits
//! in [`collab`] and [`log_view::LogRenderer`], so the controllers run the
//! same way in the extension, the CLI and tests.

pub mod collab;
pub mod labels;
pub mod log_view;
pub mod page;
pub mod wizard;

pub use collab::{FilterMetadata, InstallRoute, LogSource, RuleInstaller, TabSnapshot};
pub use labels::Labels;
pub use log_view::{LogRenderer, LogRow, LogViewController, RowStatus, Selection, TabHeader};
pub use page::LogPage;
pub use wizard::{Dialog, RequestAction, RequestInfo, RequestWizard, RuleDraft, WizardError};
