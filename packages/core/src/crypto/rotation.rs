// Периодическая ротация симметричного кольца ключей
//
// Новое кольцо сначала сохраняется во внешнем хранилище (с таймаутом) и
// только потом атомарно подменяет текущее. Ошибка на любом шаге оставляет
// кольцо прежним. Ротация и восстановление сериализуются одной блокировкой,
// иначе два параллельных шага поворачивают один и тот же снимок.

use crate::config::Config;
use crate::crypto::key_ring::{KeyRing, SharedKeyRing, SymmetricKey};
use crate::storage::KeyStore;
use crate::utils::error::{CollabError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Один шаг ротации: сгенерировать, сохранить, подменить
pub struct KeyRotationService {
    key_ring: Arc<SharedKeyRing>,
    store: Arc<dyn KeyStore>,
    store_timeout: Duration,
    /// Держится на всём пути снимок -> сохранение -> подмена
    rotation_lock: Mutex<()>,
}

impl KeyRotationService {
    pub fn new(key_ring: Arc<SharedKeyRing>, store: Arc<dyn KeyStore>) -> Self {
        Self {
            key_ring,
            store,
            store_timeout: Config::global().key_store_timeout,
            rotation_lock: Mutex::new(()),
        }
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn key_ring(&self) -> &Arc<SharedKeyRing> {
        &self.key_ring
    }

    /// Подгрузить сохранённое кольцо, если оно есть.
    ///
    /// Возвращает `true`, если кольцо из хранилища заменило начальное.
    pub async fn restore(&self) -> Result<bool> {
        let _guard = self.rotation_lock.lock().await;
        let stored = tokio::time::timeout(self.store_timeout, self.store.load_ring())
            .await
            .map_err(|_| CollabError::Timeout("loading key ring".to_string()))??;

        let Some(stored) = stored else {
            return Ok(false);
        };

        let capacity = self.key_ring.snapshot().capacity();
        let ring = KeyRing::from_stored(&stored, capacity)?;
        info!(
            target: "crypto::rotation",
            current = ring.current().generation(),
            generations = ring.len(),
            "Key ring restored from store"
        );
        self.key_ring.replace(ring);
        Ok(true)
    }

    /// Повернуть кольцо на одно поколение. Возвращает новое текущее поколение.
    pub async fn rotate_keys(&self) -> Result<u64> {
        let _guard = self.rotation_lock.lock().await;
        let ring = self.key_ring.snapshot();
        let key = SymmetricKey::generate(ring.next_generation())?;
        let generation = key.generation();
        let rotated = ring.rotated(key)?;

        let stored = rotated.to_stored();
        tokio::time::timeout(self.store_timeout, self.store.save_ring(&stored))
            .await
            .map_err(|_| {
                CollabError::Timeout(format!(
                    "saving key ring exceeded {:?}",
                    self.store_timeout
                ))
            })??;

        let previous = self.key_ring.replace(rotated);
        info!(
            target: "crypto::rotation",
            generation = generation,
            previous = previous.current().generation(),
            "Symmetric key rotated"
        );
        Ok(generation)
    }
}

/// Фоновая задача, вызывающая [`KeyRotationService::rotate_keys`] по таймеру
pub struct KeyRotationScheduler;

impl KeyRotationScheduler {
    /// Запустить с интервалами из [`Config`]
    pub fn spawn_with_config(service: KeyRotationService) -> Result<RotationHandle> {
        let config = Config::global();
        Self::spawn(
            service,
            config.key_rotation_interval,
            config.key_rotation_retry_interval,
        )
    }

    /// Запустить цикл ротации.
    ///
    /// Сначала ждём `interval`, затем ротируем. После ошибки следующая попытка
    /// через `retry_interval`, после успеха снова через `interval`.
    ///
    /// # Errors
    ///
    /// `CollabError::Config`, если любой из интервалов нулевой
    pub fn spawn(
        service: KeyRotationService,
        interval: Duration,
        retry_interval: Duration,
    ) -> Result<RotationHandle> {
        if interval.is_zero() || retry_interval.is_zero() {
            return Err(CollabError::Config(
                "Rotation intervals must be non-zero".to_string(),
            ));
        }

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut delay = interval;
            info!(
                target: "crypto::rotation",
                interval_secs = interval.as_secs(),
                "Key rotation scheduler started"
            );

            loop {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                        continue;
                    }
                }

                delay = match service.rotate_keys().await {
                    Ok(_) => interval,
                    Err(e) => {
                        error!(
                            target: "crypto::rotation",
                            error = %e,
                            retry_secs = retry_interval.as_secs(),
                            "Key rotation failed"
                        );
                        retry_interval
                    }
                };
            }

            debug!(target: "crypto::rotation", "Key rotation scheduler stopped");
        });

        Ok(RotationHandle { shutdown_tx, task })
    }
}

/// Управление запущенным планировщиком
pub struct RotationHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RotationHandle {
    /// Остановить цикл и дождаться завершения задачи
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            warn!(target: "crypto::rotation", error = %e, "Key rotation task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
