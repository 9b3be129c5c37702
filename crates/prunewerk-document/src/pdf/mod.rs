// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — content owners, resource dictionaries, and the shrink driver.

pub mod owner;
pub mod resources;
pub mod shrinker;

pub use owner::{ContentOwner, Matrix, Rect, content_owners};
pub use resources::{
    DictPath, ExtGState, FontResource, Pattern, ResourceDictionary, Shading, SoftMask, XObject,
};
pub use shrinker::{ShrinkOutcome, Shrinker, output_path_for, shrink_file};
