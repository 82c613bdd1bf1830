//! # Document Parser
//!
//! Text ⇄ structure conversion for checklist documents, plus standalone
//! structural validation. The parser knows what the document says; business
//! rules over runtime state live in the registry.
//!
//! ## Document format
//!
//! | Line | Meaning |
//! |------|---------|
//! | `#`..`######` + space + text | opens a section at that heading level |
//! | `- [ ] <id> <title>` / `- [x] <id> <title>` | opens a task (marker case- and space-tolerant) |
//! | indented `- <text>` | appended to the open task's description |
//! | `_Requirements: a, b_` | sets the open task's requirement tags |
//! | anything else | ignored |

mod document;
mod line;
mod validate;

pub use document::{parse, serialize, update_status_char, ParseMetadata, ParseOutcome};
pub use line::{classify, split_task_payload, LineKind};
pub use validate::{validate, ValidationReport};
