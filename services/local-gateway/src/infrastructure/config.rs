// ブリッジ設定
//
// リッスンアドレス・マウントプレフィックス・呼び出しタイムアウトを管理する。
// 環境変数から読み込み、コマンドライン引数で上書きできる。

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use thiserror::Error;

use crate::application::DEFAULT_INVOCATION_TIMEOUT;
use crate::domain::{MountPrefix, MountPrefixError};

/// ポート番号の環境変数名
pub const PORT_ENV: &str = "PORT";
/// リッスンアドレスの環境変数名
pub const BIND_HOST_ENV: &str = "BIND_HOST";
/// マウントプレフィックスの環境変数名
pub const MOUNT_PREFIX_ENV: &str = "MOUNT_PREFIX";
/// 呼び出しタイムアウト（ミリ秒）の環境変数名
pub const INVOCATION_TIMEOUT_MS_ENV: &str = "INVOCATION_TIMEOUT_MS";

/// デフォルトのポート番号
pub const DEFAULT_PORT: u16 = 8080;
/// デフォルトのリッスンアドレス
pub const DEFAULT_BIND_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

/// ブリッジ設定のエラー型
#[derive(Debug, Error)]
pub enum BridgeConfigError {
    /// 環境変数の値を解析できない
    #[error("環境変数の値が不正です: {name}={value}")]
    InvalidEnvVar { name: String, value: String },

    /// マウントプレフィックスが不正
    #[error(transparent)]
    MountPrefix(#[from] MountPrefixError),
}

/// ブリッジ設定
///
/// 以下の環境変数から読み込む（すべて省略可能）:
/// - PORT: リッスンポート（デフォルト: 8080）
/// - BIND_HOST: リッスンアドレス（デフォルト: 0.0.0.0）
/// - MOUNT_PREFIX: マウントプレフィックス（デフォルト: /cgm-api）
/// - INVOCATION_TIMEOUT_MS: 呼び出しタイムアウト（デフォルト: 29000）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// リッスンアドレス
    host: IpAddr,
    /// リッスンポート
    port: u16,
    /// マウントプレフィックス
    mount_prefix: MountPrefix,
    /// 1リクエストあたりの呼び出しタイムアウト
    invocation_timeout: Duration,
}

impl BridgeConfig {
    /// 明示的な値で設定を作成
    pub fn new(
        host: IpAddr,
        port: u16,
        mount_prefix: MountPrefix,
        invocation_timeout: Duration,
    ) -> Self {
        Self {
            host,
            port,
            mount_prefix,
            invocation_timeout,
        }
    }

    /// 環境変数から設定を読み込む
    ///
    /// 未設定または空文字列の環境変数はデフォルト値を使う。
    ///
    /// # エラー
    /// 値を解析できない場合、またはマウントプレフィックスが不正な場合はエラーを返す
    pub fn from_env() -> Result<Self, BridgeConfigError> {
        let host = match read_env(BIND_HOST_ENV) {
            Some(value) => parse_env(BIND_HOST_ENV, value)?,
            None => DEFAULT_BIND_HOST,
        };

        let port = match read_env(PORT_ENV) {
            Some(value) => parse_env(PORT_ENV, value)?,
            None => DEFAULT_PORT,
        };

        let mount_prefix = match read_env(MOUNT_PREFIX_ENV) {
            Some(value) => MountPrefix::parse(&value)?,
            None => MountPrefix::default(),
        };

        let invocation_timeout = match read_env(INVOCATION_TIMEOUT_MS_ENV) {
            Some(value) => Duration::from_millis(parse_env(INVOCATION_TIMEOUT_MS_ENV, value)?),
            None => DEFAULT_INVOCATION_TIMEOUT,
        };

        Ok(Self {
            host,
            port,
            mount_prefix,
            invocation_timeout,
        })
    }

    /// リッスンアドレスを上書きした設定を返す
    pub fn with_host(mut self, host: IpAddr) -> Self {
        self.host = host;
        self
    }

    /// リッスンポートを上書きした設定を返す
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// マウントプレフィックスを上書きした設定を返す
    pub fn with_mount_prefix(mut self, mount_prefix: MountPrefix) -> Self {
        self.mount_prefix = mount_prefix;
        self
    }

    /// 呼び出しタイムアウトを上書きした設定を返す
    pub fn with_invocation_timeout(mut self, invocation_timeout: Duration) -> Self {
        self.invocation_timeout = invocation_timeout;
        self
    }

    /// リッスンアドレスを取得
    pub fn host(&self) -> IpAddr {
        self.host
    }

    /// リッスンポートを取得
    pub fn port(&self) -> u16 {
        self.port
    }

    /// ソケットアドレスを取得
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// マウントプレフィックスを取得
    pub fn mount_prefix(&self) -> &MountPrefix {
        &self.mount_prefix
    }

    /// 呼び出しタイムアウトを取得
    pub fn invocation_timeout(&self) -> Duration {
        self.invocation_timeout
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_BIND_HOST,
            port: DEFAULT_PORT,
            mount_prefix: MountPrefix::default(),
            invocation_timeout: DEFAULT_INVOCATION_TIMEOUT,
        }
    }
}

fn read_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_env<T: std::str::FromStr>(name: &str, value: String) -> Result<T, BridgeConfigError> {
    value
        .parse()
        .map_err(|_| BridgeConfigError::InvalidEnvVar {
            name: name.to_string(),
            value,
        })
}
