pub use super::book::Entity as Book;
pub use super::borrowing::Entity as Borrowing;
pub use super::user::Entity as User;
