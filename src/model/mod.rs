//! Domain records shared by the core and the catalog store.

mod book;
mod cart;
mod ids;
mod notification;
mod rental;

pub use book::{Book, BookDetails, BookPatch, BookState, Price};
pub use cart::CartItem;
pub use ids::{BookId, NotificationId, RentalId, UserId};
pub use notification::{Notification, NotificationChange, NotificationKind};
pub use rental::{PaymentMethod, RentalRecord, RentalStatus, UnknownPaymentMethod};
