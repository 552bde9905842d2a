//! Stable error codes reported alongside error messages.

pub const CONTAINER_IO: &str = "DC001";
pub const CONTAINER_ZIP: &str = "DC002";
pub const CONTAINER_NOT_ZIP: &str = "DC003";
pub const CONTAINER_NOT_OPC: &str = "DC004";
pub const CONTAINER_TOO_MANY_ENTRIES: &str = "DC005";
pub const CONTAINER_PART_TOO_LARGE: &str = "DC006";
pub const CONTAINER_TOTAL_TOO_LARGE: &str = "DC007";

pub const DOCX_MISSING_DOCUMENT: &str = "DC101";
pub const DOCX_XML: &str = "DC102";

pub const UNIFY_INVALID_THRESHOLD: &str = "DC201";
pub const UNIFY_EMPTY_SIDE: &str = "DC202";
pub const UNIFY_CONFIG: &str = "DC203";
pub const UNIFY_DUMP_IO: &str = "DC204";

pub const REPORT_XML: &str = "DC301";
pub const REPORT_ZIP: &str = "DC302";
pub const REPORT_IO: &str = "DC303";

