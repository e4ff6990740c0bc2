//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query building.

use sea_query::Iden;

/// Books table schema.
#[derive(Iden, Clone, Copy)]
pub enum Books {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "title"]
    Title,
    #[iden = "author"]
    Author,
    #[iden = "description"]
    Description,
    #[iden = "price"]
    Price,
    #[iden = "image"]
    Image,
    #[iden = "owner_id"]
    OwnerId,
    #[iden = "is_available"]
    IsAvailable,
    #[iden = "rented_by"]
    RentedBy,
    #[iden = "rented_at"]
    RentedAt,
    #[iden = "last_returned_at"]
    LastReturnedAt,
    #[iden = "created_at"]
    CreatedAt,
}

impl Books {
    pub const COLUMNS: [Books; 12] = [
        Books::Id,
        Books::Title,
        Books::Author,
        Books::Description,
        Books::Price,
        Books::Image,
        Books::OwnerId,
        Books::IsAvailable,
        Books::RentedBy,
        Books::RentedAt,
        Books::LastReturnedAt,
        Books::CreatedAt,
    ];
}

/// Mirrored cart items schema.
#[derive(Iden, Clone, Copy)]
pub enum CartItems {
    Table,
    #[iden = "user_id"]
    UserId,
    #[iden = "book_id"]
    BookId,
    #[iden = "title"]
    Title,
    #[iden = "author"]
    Author,
    #[iden = "image"]
    Image,
    #[iden = "price"]
    Price,
    #[iden = "added_at"]
    AddedAt,
}

impl CartItems {
    pub const COLUMNS: [CartItems; 7] = [
        CartItems::UserId,
        CartItems::BookId,
        CartItems::Title,
        CartItems::Author,
        CartItems::Image,
        CartItems::Price,
        CartItems::AddedAt,
    ];
}

/// Rental audit records schema.
#[derive(Iden, Clone, Copy)]
pub enum Rentals {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "renter_id"]
    RenterId,
    #[iden = "owner_id"]
    OwnerId,
    #[iden = "book_id"]
    BookId,
    #[iden = "book_title"]
    BookTitle,
    #[iden = "price"]
    Price,
    #[iden = "rented_at"]
    RentedAt,
    #[iden = "return_date"]
    ReturnDate,
    #[iden = "delivery_address"]
    DeliveryAddress,
    #[iden = "payment_method"]
    PaymentMethod,
    #[iden = "status"]
    Status,
    #[iden = "recorded_at"]
    RecordedAt,
}

impl Rentals {
    pub const COLUMNS: [Rentals; 12] = [
        Rentals::Id,
        Rentals::RenterId,
        Rentals::OwnerId,
        Rentals::BookId,
        Rentals::BookTitle,
        Rentals::Price,
        Rentals::RentedAt,
        Rentals::ReturnDate,
        Rentals::DeliveryAddress,
        Rentals::PaymentMethod,
        Rentals::Status,
        Rentals::RecordedAt,
    ];
}

/// Notifications schema.
#[derive(Iden, Clone, Copy)]
pub enum Notifications {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "recipient"]
    Recipient,
    #[iden = "message"]
    Message,
    #[iden = "kind"]
    Kind,
    #[iden = "book_id"]
    BookId,
    #[iden = "rental_at"]
    RentalAt,
    #[iden = "created_at"]
    CreatedAt,
    #[iden = "read"]
    Read,
}

impl Notifications {
    pub const COLUMNS: [Notifications; 8] = [
        Notifications::Id,
        Notifications::Recipient,
        Notifications::Message,
        Notifications::Kind,
        Notifications::BookId,
        Notifications::RentalAt,
        Notifications::CreatedAt,
        Notifications::Read,
    ];
}

/// SQL for creating all catalog tables.
pub const CREATE_CATALOG_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS books (
    id TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    author TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    price INTEGER NOT NULL,
    image TEXT,
    owner_id TEXT NOT NULL,
    is_available INTEGER NOT NULL DEFAULT 1,
    rented_by TEXT,
    rented_at TEXT,
    last_returned_at TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_books_owner ON books(owner_id);
CREATE INDEX IF NOT EXISTS idx_books_renter ON books(rented_by);

CREATE TABLE IF NOT EXISTS cart_items (
    user_id TEXT NOT NULL,
    book_id TEXT NOT NULL,
    title TEXT NOT NULL,
    author TEXT NOT NULL,
    image TEXT,
    price INTEGER NOT NULL,
    added_at TEXT NOT NULL,
    PRIMARY KEY (user_id, book_id)
);

CREATE TABLE IF NOT EXISTS rentals (
    id TEXT PRIMARY KEY NOT NULL,
    renter_id TEXT NOT NULL,
    owner_id TEXT NOT NULL,
    book_id TEXT NOT NULL,
    book_title TEXT NOT NULL,
    price INTEGER NOT NULL,
    rented_at TEXT NOT NULL,
    return_date TEXT NOT NULL,
    delivery_address TEXT NOT NULL,
    payment_method TEXT NOT NULL,
    status TEXT NOT NULL,
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_rentals_book ON rentals(book_id);
CREATE INDEX IF NOT EXISTS idx_rentals_renter ON rentals(renter_id);

CREATE TABLE IF NOT EXISTS notifications (
    id TEXT PRIMARY KEY NOT NULL,
    recipient TEXT NOT NULL,
    message TEXT NOT NULL,
    kind TEXT NOT NULL,
    book_id TEXT NOT NULL,
    rental_at TEXT NOT NULL,
    created_at TEXT NOT NULL,
    read INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_notifications_recipient ON notifications(recipient);
"#;
