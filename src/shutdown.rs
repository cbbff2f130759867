//! 关闭信号
//!
//! 调度器的空闲等待和进行中的探测都会观察该信号，收到后立即退出

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

#[cfg(unix)]
use signal_hook::consts::{SIGINT, SIGTERM};
#[cfg(unix)]
use signal_hook_tokio::Signals;

/// 关闭信号的发送端
#[derive(Debug, Clone)]
pub struct ShutdownTrigger {
    sender: Arc<watch::Sender<bool>>,
}

/// 关闭信号的接收端，可以克隆给多个任务
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

/// 创建一对关联的触发器和信号
pub fn channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (sender, receiver) = watch::channel(false);
    (
        ShutdownTrigger {
            sender: Arc::new(sender),
        },
        ShutdownSignal { receiver },
    )
}

impl ShutdownTrigger {
    /// 触发关闭，重复调用无副作用
    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }

    /// 创建一个新的接收端
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            receiver: self.sender.subscribe(),
        }
    }
}

impl ShutdownSignal {
    /// 是否已经触发关闭
    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    /// 等待关闭信号
    ///
    /// 已经触发时立即返回；发送端全部被丢弃时视为永不关闭。
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        let triggered = receiver.wait_for(|triggered| *triggered).await.is_ok();
        if !triggered {
            std::future::pending::<()>().await;
        }
    }
}

/// 监听进程信号并在收到时触发关闭
///
/// Unix 下处理 SIGINT 和 SIGTERM，其他平台处理 Ctrl+C。
pub fn spawn_signal_listener(trigger: ShutdownTrigger) -> crate::error::Result<()> {
    #[cfg(unix)]
    {
        use futures::stream::StreamExt;

        let mut signals = Signals::new([SIGINT, SIGTERM])?;
        let handle = signals.handle();

        tokio::spawn(async move {
            if let Some(signal) = signals.next().await {
                match signal {
                    SIGINT => info!("接收到 SIGINT 信号，开始优雅关闭..."),
                    SIGTERM => info!("接收到 SIGTERM 信号，开始优雅关闭..."),
                    other => info!("接收到信号 {}，开始优雅关闭...", other),
                }
                trigger.trigger();
            }
            handle.close();
        });
    }

    #[cfg(not(unix))]
    {
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("接收到 Ctrl+C，开始优雅关闭...");
                    trigger.trigger();
                }
                Err(err) => {
                    error!("监听中断信号失败: {}", err);
                }
            }
        });
    }

    Ok(())
}

/// 在信号监听器无法安装时记录错误，返回的信号只能由调用方手动触发
pub fn install_or_log(trigger: &ShutdownTrigger) -> ShutdownSignal {
    if let Err(e) = spawn_signal_listener(trigger.clone()) {
        error!("安装信号处理器失败: {}", e);
    }
    trigger.subscribe()
}
