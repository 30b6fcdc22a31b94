/// Command names and their accepted spellings

use std::fmt;

/// Every command the bot understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Start,
    Help,
    CreateTask,
    MyTasks,
    AllTasks,
    TaskDetails,
    UpdateStatus,
    SetRole,
    AllowUser,
    History,
    Comment,
    Comments,
    Settings,
    Cancel,
}

/// Accepted spelling → command. Lookups use the lower-cased token.
static ALIASES: &[(&str, Command)] = &[
    ("/start", Command::Start),
    ("/старт", Command::Start),
    ("/help", Command::Help),
    ("/помощь", Command::Help),
    ("/create_task", Command::CreateTask),
    ("/создать_задачу", Command::CreateTask),
    ("/my_tasks", Command::MyTasks),
    ("/мои_задачи", Command::MyTasks),
    ("/all_tasks", Command::AllTasks),
    ("/все_задачи", Command::AllTasks),
    ("/task_details", Command::TaskDetails),
    ("/детали_задачи", Command::TaskDetails),
    ("/update_status", Command::UpdateStatus),
    ("/обновить_статус", Command::UpdateStatus),
    ("/set_role", Command::SetRole),
    ("/изменить_роль", Command::SetRole),
    ("/allow_user", Command::AllowUser),
    ("/добавить_пользователя", Command::AllowUser),
    ("/history", Command::History),
    ("/история", Command::History),
    ("/comment", Command::Comment),
    ("/комментарий", Command::Comment),
    ("/comments", Command::Comments),
    ("/комментарии", Command::Comments),
    ("/settings", Command::Settings),
    ("/настройки", Command::Settings),
    ("/cancel", Command::Cancel),
    ("/отмена", Command::Cancel),
];

impl Command {
    pub const ALL: [Command; 14] = [
        Command::Start,
        Command::Help,
        Command::CreateTask,
        Command::MyTasks,
        Command::AllTasks,
        Command::TaskDetails,
        Command::UpdateStatus,
        Command::SetRole,
        Command::AllowUser,
        Command::History,
        Command::Comment,
        Command::Comments,
        Command::Settings,
        Command::Cancel,
    ];

    /// Resolves a normalized command token (lower-case, no `@botname`)
    pub fn from_token(token: &str) -> Option<Self> {
        ALIASES
            .iter()
            .find(|(alias, _)| *alias == token)
            .map(|(_, command)| *command)
    }

    /// ASCII spelling shown in help and usage texts
    pub fn canonical(&self) -> &'static str {
        match self {
            Command::Start => "/start",
            Command::Help => "/help",
            Command::CreateTask => "/create_task",
            Command::MyTasks => "/my_tasks",
            Command::AllTasks => "/all_tasks",
            Command::TaskDetails => "/task_details",
            Command::UpdateStatus => "/update_status",
            Command::SetRole => "/set_role",
            Command::AllowUser => "/allow_user",
            Command::History => "/history",
            Command::Comment => "/comment",
            Command::Comments => "/comments",
            Command::Settings => "/settings",
            Command::Cancel => "/cancel",
        }
    }

    /// Every accepted spelling of this command
    pub fn aliases(&self) -> impl Iterator<Item = &'static str> + '_ {
        ALIASES
            .iter()
            .filter(move |(_, command)| command == self)
            .map(|(alias, _)| *alias)
    }

    /// Whether only administrators may run the command
    pub fn admin_only(&self) -> bool {
        matches!(
            self,
            Command::CreateTask | Command::AllTasks | Command::SetRole | Command::AllowUser
        )
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical())
    }
}
