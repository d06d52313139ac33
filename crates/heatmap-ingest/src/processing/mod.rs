pub mod capability;
pub mod dedupe;
pub mod extract;
pub mod normalize;
pub mod resolve;
pub mod sentiment;
pub mod themes;

pub use capability::CapabilityProbe;
pub use dedupe::{dedupe, DedupeOutcome};
pub use extract::MentionExtractor;
pub use normalize::normalize;
pub use resolve::{resolve, ResolutionOutcome};
pub use sentiment::{score_mentions, LexiconSentimentModel, SentimentModel};
pub use themes::{compute_themes, FastEmbedEmbedder, MentionSentence, SentenceEmbedder, Theme};
