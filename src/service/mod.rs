/// Domain services
///
/// Each manager owns a handle to the pool and composes repository calls in
/// one transaction per operation. The caller's user id is always an explicit
/// argument.

pub mod headings;
pub mod lists;
pub mod tasks;
pub mod users;

pub use headings::HeadingManager;
pub use lists::ListManager;
pub use tasks::{CreateTaskInput, TaskManager, UpdateTaskInput, UpdateTaskTimeInput};
pub use users::UserManager;
