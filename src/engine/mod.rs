pub mod fuzzy;
pub mod kana;
pub mod ordering;
pub mod question_type;
pub mod selection;
pub mod srs_registry;
pub mod srs_system;
pub mod stage_buckets;
pub mod subject;
pub mod verdict;

pub use question_type::QuestionType;
pub use srs_registry::SrsRegistry;
pub use subject::{Subject, SubjectId, SubjectType};
pub use verdict::{AnswerVerdict, CloseEnoughAction};
