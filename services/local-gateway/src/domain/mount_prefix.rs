/// マウントプレフィックス
///
/// ブリッジの全ルートを登録する先頭パスセグメント（例: `/cgm-api`）。
/// パス除去ルールはプレフィックスがちょうど2番目のセグメントを占めることを前提とするため、
/// `/`で始まる空でない1セグメントのみを受け付ける。
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// デフォルトのマウントプレフィックス（先頭の`/`を除く）
pub const DEFAULT_MOUNT_PREFIX_SEGMENT: &str = "cgm-api";

/// マウントプレフィックスの検証エラー
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MountPrefixError {
    /// 先頭が`/`ではない
    #[error("マウントプレフィックスは'/'で始まる必要があります: {0}")]
    MissingLeadingSlash(String),

    /// `/`のみでセグメントが空
    #[error("マウントプレフィックスのセグメントが空です")]
    EmptySegment,

    /// 2つ以上のセグメントを含む（末尾の`/`も含む）
    #[error("マウントプレフィックスは1セグメントのみ指定できます: {0}")]
    NestedSegment(String),

    /// ルート定義に使えない文字を含む
    #[error("マウントプレフィックスに使用できない文字が含まれています: {0}")]
    InvalidCharacter(String),
}

/// 検証済みのマウントプレフィックス
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MountPrefix {
    /// 先頭の`/`を除いたセグメント（例: "cgm-api"）
    segment: String,
}

impl MountPrefix {
    /// 文字列からマウントプレフィックスを作成
    ///
    /// # 戻り値
    /// - `Ok(MountPrefix)`: `/segment`形式の妥当な値
    /// - `Err(MountPrefixError)`: 形式が不正
    pub fn parse(value: &str) -> Result<Self, MountPrefixError> {
        let Some(segment) = value.strip_prefix('/') else {
            return Err(MountPrefixError::MissingLeadingSlash(value.to_string()));
        };

        if segment.is_empty() {
            return Err(MountPrefixError::EmptySegment);
        }

        if segment.contains('/') {
            return Err(MountPrefixError::NestedSegment(value.to_string()));
        }

        // axumのパス構文（{param}, {*wildcard}）と衝突する文字
        if segment.contains(['{', '}', '*']) {
            return Err(MountPrefixError::InvalidCharacter(value.to_string()));
        }

        Ok(Self {
            segment: segment.to_string(),
        })
    }

    /// 先頭の`/`を除いたセグメントを取得
    pub fn segment(&self) -> &str {
        &self.segment
    }
}

impl Default for MountPrefix {
    fn default() -> Self {
        Self {
            segment: DEFAULT_MOUNT_PREFIX_SEGMENT.to_string(),
        }
    }
}

impl fmt::Display for MountPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segment)
    }
}

impl FromStr for MountPrefix {
    type Err = MountPrefixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
