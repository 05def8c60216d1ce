//! IP → 국가 코드 보강
//!
//! [`GeoEnricher`]는 수집 실행마다 한 번 만들어져 세 소스가 참조로 공유합니다.
//! 국가 DB는 첫 조회 시점에 한 번만 열리고, 조회 결과는 실행이 끝날 때까지
//! 제거 없이 캐시됩니다 (없음 결과도 캐시).
//!
//! DB 경로가 비어 있거나 파일이 없으면 첫 조회에서 설정 에러가 발생합니다.
//! 파일은 있지만 DB로 읽을 수 없으면 경고를 한 번 남기고 "DB 없음" 상태가 되며,
//! 이후 조회는 모두 `None`입니다. 그 외 조회 실패 (잘못된 주소, DB에 없는 대역)도
//! 모두 `None`으로 기록됩니다.

use std::collections::HashMap;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use trailscope_core::metrics as m;

use crate::error::CollectorError;

/// 국가 조회 DB 추상화
///
/// 실제 구현은 [`MaxMindCountryDatabase`], 테스트는 조회 횟수를 세는 구현을 사용합니다.
pub trait CountryDatabase: Send + Sync {
    /// IP의 ISO 3166 두 글자 국가 코드를 반환합니다. 찾지 못하면 `None`.
    fn country_code(&self, ip: IpAddr) -> Option<String>;
}

/// MaxMind GeoLite2/GeoIP2 Country DB
pub struct MaxMindCountryDatabase {
    reader: maxminddb::Reader<Vec<u8>>,
}

impl MaxMindCountryDatabase {
    /// DB 파일을 엽니다.
    pub fn open(path: &Path) -> Result<Self, CollectorError> {
        let reader =
            maxminddb::Reader::open_readfile(path).map_err(|e| CollectorError::GeoDatabase {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { reader })
    }
}

impl CountryDatabase for MaxMindCountryDatabase {
    fn country_code(&self, ip: IpAddr) -> Option<String> {
        self.reader
            .lookup::<maxminddb::geoip2::Country>(ip)
            .ok()
            .and_then(|record| record.country)
            .and_then(|country| country.iso_code)
            .map(str::to_owned)
    }
}

enum DatabaseState {
    /// 아직 열지 않음
    Pending,
    Ready(Arc<dyn CountryDatabase>),
    /// 파일은 있지만 읽을 수 없음
    Unavailable,
}

struct GeoState {
    database: DatabaseState,
    cache: HashMap<String, Option<String>>,
}

/// 지연 초기화되는 국가 DB 핸들과 IP별 결과 캐시
///
/// 초기화와 캐시 갱신은 하나의 락으로 보호되므로 여러 태스크에서 공유해도 안전합니다.
pub struct GeoEnricher {
    db_path: String,
    state: Mutex<GeoState>,
}

impl GeoEnricher {
    /// 설정된 경로로 보강기를 만듭니다. DB는 첫 조회 때 열립니다.
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            state: Mutex::new(GeoState {
                database: DatabaseState::Pending,
                cache: HashMap::new(),
            }),
        }
    }

    /// 이미 열린 DB로 보강기를 만듭니다.
    pub fn with_database(database: Arc<dyn CountryDatabase>) -> Self {
        Self {
            db_path: String::new(),
            state: Mutex::new(GeoState {
                database: DatabaseState::Ready(database),
                cache: HashMap::new(),
            }),
        }
    }

    /// IP의 국가 코드를 조회합니다.
    ///
    /// - 빈 문자열: DB와 캐시 모두 건드리지 않고 `None`
    /// - 캐시 적중: 캐시된 값 (없음 포함)
    /// - 캐시 미스: DB 조회 후 결과를 캐시
    ///
    /// # Errors
    /// 첫 조회에서 DB 경로가 비어 있으면 [`CollectorError::Config`],
    /// 파일이 없으면 [`CollectorError::GeoDatabase`]를 반환합니다.
    pub fn lookup_country(&self, ip: &str) -> Result<Option<String>, CollectorError> {
        if ip.is_empty() {
            return Ok(None);
        }

        let mut state = self.lock();
        if let Some(cached) = state.cache.get(ip) {
            metrics::counter!(m::GEO_CACHE_HITS_TOTAL).increment(1);
            return Ok(cached.clone());
        }

        if matches!(state.database, DatabaseState::Pending) {
            state.database = self.open_database()?;
        }

        let code = match &state.database {
            DatabaseState::Ready(database) => {
                metrics::counter!(m::GEO_LOOKUPS_TOTAL).increment(1);
                ip.parse::<IpAddr>()
                    .ok()
                    .and_then(|addr| database.country_code(addr))
            }
            DatabaseState::Pending | DatabaseState::Unavailable => None,
        };
        state.cache.insert(ip.to_owned(), code.clone());
        Ok(code)
    }

    /// `Option` 키 편의 함수 (`None`은 빈 문자열과 같음)
    pub fn lookup_optional(&self, ip: Option<&str>) -> Result<Option<String>, CollectorError> {
        match ip {
            Some(ip) => self.lookup_country(ip),
            None => Ok(None),
        }
    }

    /// 캐시된 IP 수
    pub fn cached_entries(&self) -> usize {
        self.lock().cache.len()
    }

    /// DB 초기화가 끝났는지 확인합니다 (읽을 수 없는 DB로 끝난 경우 포함).
    pub fn is_initialized(&self) -> bool {
        !matches!(self.lock().database, DatabaseState::Pending)
    }

    fn lock(&self) -> MutexGuard<'_, GeoState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn open_database(&self) -> Result<DatabaseState, CollectorError> {
        let path = resolve_db_path(&self.db_path)?;
        if !path.exists() {
            return Err(CollectorError::GeoDatabase {
                path: path.display().to_string(),
                reason: "file not found".to_owned(),
            });
        }
        match MaxMindCountryDatabase::open(&path) {
            Ok(db) => {
                tracing::info!(path = %path.display(), "country database opened");
                Ok(DatabaseState::Ready(Arc::new(db)))
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "country database unreadable, country will be absent for every record"
                );
                Ok(DatabaseState::Unavailable)
            }
        }
    }
}

/// 설정된 DB 경로를 절대 경로로 바꿉니다. 상대 경로는 작업 디렉토리 기준입니다.
pub fn resolve_db_path(configured: &str) -> Result<PathBuf, CollectorError> {
    if configured.trim().is_empty() {
        return Err(CollectorError::Config {
            field: "geoip.db_path".to_owned(),
            reason: "country database path is not configured".to_owned(),
        });
    }
    let path = PathBuf::from(configured);
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
