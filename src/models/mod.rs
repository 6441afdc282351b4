mod de;

pub mod link;
pub mod scan;

pub use link::{
    ContentKind, CreateLinkRequest, CreateLinkResponse, ImageQuery, ImageResponse, LinkSummary,
    QrStyle, ResolveResponse, ShortLink, format_timestamp,
};
pub use scan::{Country, DeviceClass, DeviceCounts, RecordScanRequest, ScanBucket, ScanEvent, StatsSnapshot};
