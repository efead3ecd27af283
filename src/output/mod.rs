//! Output containers for cropped frames

pub mod container;
pub mod channel_policy;
pub mod multipage_tiff;

pub use container::{ContainerFactory, OutputContainer};
pub use channel_policy::ChannelPolicy;
pub use multipage_tiff::{MultiPageTiffWriter, Page, PageLayout, TiffContainerFactory, TiffWriterOptions};
