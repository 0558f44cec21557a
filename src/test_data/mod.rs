//-
// Copyright (c) 2024, Jason Lingle
//
// This file is part of Mailbridge.
//
// Mailbridge is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Mailbridge is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for
// more details.
//
// You should have received a copy of the GNU General Public License along with
// Mailbridge. If not, see <http://www.gnu.org/licenses/>.

//! Captured webmail pages used as contract fixtures.

/// The login page as served to a fresh visitor.
pub static LOGIN_PAGE_HTML: &str = include_str!("login_page.html");

/// The page returned after submitting bad credentials: the login form again,
/// with an error message.
pub static LOGIN_FAILED_HTML: &str = include_str!("login_failed.html");

/// The mailbox view shown after a successful login.
pub static MAILBOX_HTML: &str = include_str!("mailbox.html");
