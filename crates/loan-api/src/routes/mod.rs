//! HTTP route handlers, grouped by resource.
//!
//! | Prefix | Module |
//! |--------|--------|
//! | `/api/v1/loans` | [`loans`] |
//! | `/api/v1/users` | [`users`] |
//! | `/api/v1/admin` | [`admin`] |

pub mod admin;
pub mod loans;
pub mod users;
