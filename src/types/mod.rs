mod filters;
mod pagination;
mod stats;
mod user;

pub use filters::{RoleFilter, StatusFilter, UserFilters};
pub use pagination::{Page, Pagination};
pub use stats::{ChartPoint, DecodedCollection, ExportMetadata, PublicKey, UserStats};
pub use user::{NewUser, Role, Status, User, UserUpdate};
