//! Error handling for quillpdf

use thiserror::Error;

/// The main error type for quillpdf operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("document is encrypted; load it with ignore_encryption to proceed")]
    EncryptedPdf,
    #[error("page belongs to a different document; copy it into this one first")]
    ForeignPage,
    #[error("cannot remove a page from an empty document")]
    RemovePageFromEmptyDocument,
    #[error("no fontkit registered; call register_fontkit before embedding custom fonts")]
    FontkitNotRegistered,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("parse error at byte {offset}: {kind}")]
    Parse { offset: usize, kind: ParseErrorKind },
    #[error("embed error: {0}")]
    Embed(EmbedErrorKind),
    #[error("page index {index} out of range (document has {count} pages)")]
    PageIndexOutOfRange { index: usize, count: usize },
    #[error("system error: {0}")]
    System(#[from] std::io::Error),
}

/// What went wrong while decoding the byte stream
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error("missing %%EOF marker")]
    MissingEof,
    #[error("malformed or missing cross-reference table")]
    BadXref,
    #[error("invalid indirect object header")]
    BadObjectHeader,
    #[error("stream length does not match its data")]
    BadStreamLength,
    #[error("stream uses an unsupported filter")]
    UnsupportedFilter,
    #[error("cross-reference chain exceeds the recursion bound")]
    DepthExceeded,
}

/// What went wrong inside a font or image embedder
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmbedErrorKind {
    #[error("JPEG bit depth is not 8")]
    UnsupportedJpegBitDepth,
    #[error("PNG is missing its IHDR chunk")]
    PngMissingIhdr,
    #[error("PNG image data is truncated")]
    PngTruncatedIdat,
    #[error("PNG feature is not supported: {0}")]
    PngUnsupported(String),
    #[error("font program failed to parse")]
    FontParseFailed,
    #[error("font subsetting failed")]
    SubsetFailed,
}

impl Error {
    pub(crate) fn parse(offset: usize, kind: ParseErrorKind) -> Self {
        Error::Parse { offset, kind }
    }

    pub(crate) fn invalid<S: Into<String>>(msg: S) -> Self {
        Error::InvalidInput(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
