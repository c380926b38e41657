//! 첨부 파일 안전성 검증기
//!
//! 신뢰할 수 없는 업로드가 파싱 단계에 도달하기 전에 확장자,
//! MIME 타입, 압축 해제 폭탄, 경로 탈출을 검사합니다. 잘못된
//! 입력은 오류가 아니라 거부 사유로 보고됩니다.

use std::io::Read;

use logwarden_core::metrics::{INGEST_REJECTED_TOTAL, LABEL_REASON};

use crate::error::PipelineError;

/// 허용 확장자
const ALLOWED_EXTENSIONS: &[&str] = &["log", "txt", "json", "ndjson", "gz", "zip"];
/// 허용 MIME 타입
const ALLOWED_MIME_TYPES: &[&str] = &[
    "text/plain",
    "application/json",
    "application/x-ndjson",
    "application/gzip",
    "application/x-gzip",
    "application/zip",
];
/// zip 멤버 수 상한
const MAX_ARCHIVE_MEMBERS: usize = 200;
/// 압축 해제 총량 상한
const MAX_UNCOMPRESSED_BYTES: u64 = 32 * 1024 * 1024; // 32 MiB
/// 멤버당 압축비 상한 -- 초과 시 압축 폭탄으로 간주
const MAX_COMPRESSION_RATIO: u64 = 200;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// 검증 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationVerdict {
    /// 허용 여부
    pub allowed: bool,
    /// 거부 사유 (허용이면 None)
    pub reason: Option<String>,
}

impl ValidationVerdict {
    fn accepted() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    /// 거부 판정을 만들고 거부 카운터를 사유 레이블과 함께 올립니다.
    fn rejected(kind: &'static str, reason: impl Into<String>) -> Self {
        metrics::counter!(INGEST_REJECTED_TOTAL, LABEL_REASON => kind).increment(1);
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// 파일 확장자, MIME 타입, 아카이브 내용물을 순서대로 검사합니다.
///
/// CPU 바운드 작업이므로 요청 처리 경로에서는
/// [`validate_attachment`]를 사용하십시오.
pub fn validate_attachment_sync(
    filename: &str,
    declared_mime: Option<&str>,
    content: &[u8],
) -> ValidationVerdict {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase());
    let Some(extension) = extension else {
        return ValidationVerdict::rejected(
            "extension",
            format!(
                "file '{filename}' has no extension; allowed: {}",
                ALLOWED_EXTENSIONS.join(", ")
            ),
        );
    };
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return ValidationVerdict::rejected(
            "extension",
            format!(
                "file extension '.{extension}' is not allowed; allowed: {}",
                ALLOWED_EXTENSIONS.join(", ")
            ),
        );
    }

    if let Some(mime) = declared_mime {
        let mime = mime
            .split(';')
            .next()
            .unwrap_or(mime)
            .trim()
            .to_lowercase();
        if !mime.is_empty() && !ALLOWED_MIME_TYPES.contains(&mime.as_str()) {
            return ValidationVerdict::rejected(
                "mime",
                format!("MIME type '{mime}' is not allowed"),
            );
        }
    }

    if extension == "zip" {
        return validate_zip(content);
    }
    if extension == "gz" || content.starts_with(&GZIP_MAGIC) {
        return validate_gzip(content);
    }

    ValidationVerdict::accepted()
}

/// [`validate_attachment_sync`]를 blocking 스레드 풀에서 실행합니다.
pub async fn validate_attachment(
    filename: &str,
    declared_mime: Option<&str>,
    content: Vec<u8>,
) -> Result<ValidationVerdict, PipelineError> {
    let filename = filename.to_owned();
    let declared_mime = declared_mime.map(str::to_owned);
    tokio::task::spawn_blocking(move || {
        validate_attachment_sync(&filename, declared_mime.as_deref(), &content)
    })
    .await
    .map_err(|e| PipelineError::Task(format!("validation task failed: {e}")))
}

fn validate_zip(content: &[u8]) -> ValidationVerdict {
    let cursor = std::io::Cursor::new(content);
    let mut archive = match zip::ZipArchive::new(cursor) {
        Ok(archive) => archive,
        Err(_) => {
            return ValidationVerdict::rejected("corrupt", "archive is corrupt or unreadable");
        }
    };

    if archive.len() > MAX_ARCHIVE_MEMBERS {
        return ValidationVerdict::rejected(
            "archive_members",
            format!(
                "archive has {} members (max {MAX_ARCHIVE_MEMBERS})",
                archive.len()
            ),
        );
    }

    let mut total_uncompressed: u64 = 0;
    for index in 0..archive.len() {
        let member = match archive.by_index_raw(index) {
            Ok(member) => member,
            Err(_) => {
                return ValidationVerdict::rejected("corrupt", "archive is corrupt or unreadable");
            }
        };

        let name = member.name();
        let unsafe_path = name.starts_with('/')
            || name.starts_with('\\')
            || name
                .split(['/', '\\'])
                .any(|segment| segment == "..");
        if unsafe_path {
            return ValidationVerdict::rejected(
                "path_traversal",
                format!("archive member '{name}' has an unsafe path (path traversal)"),
            );
        }

        let compressed = member.compressed_size();
        let uncompressed = member.size();
        if compressed > 0 && uncompressed / compressed > MAX_COMPRESSION_RATIO {
            return ValidationVerdict::rejected(
                "decompression_bomb",
                format!(
                    "archive member '{name}' exceeds compression ratio {MAX_COMPRESSION_RATIO} (decompression bomb)"
                ),
            );
        }

        total_uncompressed = total_uncompressed.saturating_add(uncompressed);
        if total_uncompressed > MAX_UNCOMPRESSED_BYTES {
            return ValidationVerdict::rejected(
                "size",
                format!("archive expands beyond {MAX_UNCOMPRESSED_BYTES} bytes"),
            );
        }
    }

    ValidationVerdict::accepted()
}

fn validate_gzip(content: &[u8]) -> ValidationVerdict {
    // 상한 + 1바이트까지만 스트리밍 해제하여 전체를 적재하지 않음
    let decoder = flate2::read::GzDecoder::new(content);
    let mut limited = decoder.take(MAX_UNCOMPRESSED_BYTES + 1);
    let mut buffer = [0u8; 64 * 1024];
    let mut decompressed: u64 = 0;

    loop {
        match limited.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => {
                decompressed += n as u64;
                if decompressed > MAX_UNCOMPRESSED_BYTES {
                    return ValidationVerdict::rejected(
                        "size",
                        format!("gzip content expands beyond {MAX_UNCOMPRESSED_BYTES} bytes"),
                    );
                }
            }
            Err(_) => {
                return ValidationVerdict::rejected("corrupt", "archive is corrupt or unreadable");
            }
        }
    }

    ValidationVerdict::accepted()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn zip_with_members(members: &[(&str, &[u8])]) -> Vec<u8> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        let mut writer = zip::ZipWriter::new(&mut cursor);
        for (name, data) in members {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap();
        cursor.into_inner()
    }

    fn gzip_bytes(data: &[u8]) -> Vec<u8> {
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn plain_log_file_is_accepted() {
        let v = validate_attachment_sync("server.log", Some("text/plain"), b"hello");
        assert!(v.allowed);
        assert_eq!(v.reason, None);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let v = validate_attachment_sync("payload.exe", None, b"MZ");
        assert!(!v.allowed);
        assert!(v.reason.unwrap().contains(".exe"));
    }

    #[test]
    fn missing_extension_is_rejected() {
        let v = validate_attachment_sync("noext", None, b"data");
        assert!(!v.allowed);
    }

    #[test]
    fn disallowed_mime_is_rejected() {
        let v = validate_attachment_sync("a.log", Some("application/x-executable"), b"data");
        assert!(!v.allowed);
        assert!(v.reason.unwrap().contains("x-executable"));
    }

    #[test]
    fn mime_parameters_are_ignored() {
        let v = validate_attachment_sync("a.log", Some("text/plain; charset=utf-8"), b"data");
        assert!(v.allowed);
    }

    #[test]
    fn valid_zip_is_accepted() {
        let bytes = zip_with_members(&[("logs/app.log", b"line one\nline two\n")]);
        let v = validate_attachment_sync("bundle.zip", Some("application/zip"), &bytes);
        assert!(v.allowed);
    }

    #[test]
    fn path_traversal_member_is_rejected() {
        let bytes = zip_with_members(&[("../etc/passwd", b"root:x:0:0")]);
        let v = validate_attachment_sync("bundle.zip", None, &bytes);
        assert!(!v.allowed);
        assert!(v.reason.unwrap().contains("path traversal"));
    }

    #[test]
    fn absolute_member_path_is_rejected() {
        let bytes = zip_with_members(&[("/etc/shadow", b"x")]);
        let v = validate_attachment_sync("bundle.zip", None, &bytes);
        assert!(!v.allowed);
    }

    #[test]
    fn too_many_members_is_rejected() {
        let members: Vec<(String, &[u8])> = (0..=MAX_ARCHIVE_MEMBERS)
            .map(|i| (format!("f{i}.log"), b"x".as_slice()))
            .collect();
        let borrowed: Vec<(&str, &[u8])> =
            members.iter().map(|(n, d)| (n.as_str(), *d)).collect();
        let bytes = zip_with_members(&borrowed);
        let v = validate_attachment_sync("bundle.zip", None, &bytes);
        assert!(!v.allowed);
        assert!(v.reason.unwrap().contains("members"));
    }

    #[test]
    fn high_ratio_member_is_rejected_as_bomb() {
        // 압축이 잘 되는 반복 데이터로 압축비 상한을 초과시킴
        let payload = vec![b'a'; 8 * 1024 * 1024];
        let bytes = zip_with_members(&[("bomb.log", &payload)]);
        let v = validate_attachment_sync("bundle.zip", None, &bytes);
        assert!(!v.allowed);
        assert!(v.reason.unwrap().contains("bomb"));
    }

    #[test]
    fn corrupt_zip_is_rejected_generically() {
        let v = validate_attachment_sync("bundle.zip", None, b"PK\x03\x04 not a real zip");
        assert!(!v.allowed);
        assert!(v.reason.unwrap().contains("corrupt"));
    }

    #[test]
    fn small_gzip_is_accepted() {
        let bytes = gzip_bytes(b"a few log lines\n");
        let v = validate_attachment_sync("logs.gz", Some("application/gzip"), &bytes);
        assert!(v.allowed);
    }

    #[test]
    fn corrupt_gzip_is_rejected() {
        let v = validate_attachment_sync("logs.gz", None, &[0x1f, 0x8b, 0xff, 0xff, 0x00]);
        assert!(!v.allowed);
    }

    #[tokio::test]
    async fn async_wrapper_runs_off_the_request_path() {
        let verdict = validate_attachment("a.log", None, b"fine".to_vec())
            .await
            .unwrap();
        assert!(verdict.allowed);
    }
}
