#[cfg(feature = "core")]
#[doc(inline)]
pub use mimtools_core as core;

#[cfg(feature = "seqstore")]
#[doc(inline)]
pub use mimtools_seqstore as seqstore;

#[cfg(feature = "analyze")]
#[doc(inline)]
pub use mimtools_analyze as analyze;
