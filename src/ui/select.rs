use anyhow::Result;
use dialoguer::Select;

/// 配置项选择，返回 None 表示操作者要退出
pub trait ProfileSelector: Send {
    fn select(&mut self, names: &[String]) -> Result<Option<usize>>;
}

/// 交互式菜单，Esc 或 q 退出
#[derive(Debug, Default)]
pub struct TerminalSelector {
    last: usize,
}

impl TerminalSelector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileSelector for TerminalSelector {
    fn select(&mut self, names: &[String]) -> Result<Option<usize>> {
        if names.is_empty() {
            return Ok(None);
        }

        let choice = Select::new()
            .with_prompt("Select a profile to sync (Esc to quit)")
            .items(names)
            .default(self.last.min(names.len() - 1))
            .interact_opt()?;

        if let Some(index) = choice {
            self.last = index;
        }
        Ok(choice)
    }
}
