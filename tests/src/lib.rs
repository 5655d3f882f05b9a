//! End-to-end discovery scenarios against the public `pingx-core` API.

#[cfg(test)]
mod discovery;
