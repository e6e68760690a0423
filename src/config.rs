/// 配置管理模組
///
/// 本模組負責從 `-c` 指定的配置文件與 `API__` 前綴的環境變數加載、驗證系統配置。
/// 配置在程序啟動時加載一次，之後以 `ApplicationConfig` 值顯式傳遞給各組件。
// 宣告子模組
pub mod loader;
pub mod types;
pub mod validation;

// 重新導出常用組件
pub use loader::{ConfigLoadError, ConfigLoader};
pub use types::*;
pub use validation::{ValidationError, ValidationUtils, Validator};
