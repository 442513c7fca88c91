pub use crate::model::{Author, CreateUserInput, SafeUser, UpdateUserInput};
