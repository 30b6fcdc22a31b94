/// Command dispatcher
///
/// Turns one incoming chat message into a reply (and any side
/// notifications for other users). Every path produces a reply; failures are
/// logged here and rendered as chat text, never returned to the webhook.
///
/// Order of checks for every message:
///
/// 1. resolve the sender (registration or allow-list)
/// 2. reject administrator commands for employees
/// 3. parse arguments and run the task operation

pub mod replies;
pub mod session;

use chrono::{DateTime, Utc};
use std::time::Instant;
use taskbot_shared::auth::{resolve_sender, AccessMode, AccessOutcome, AuthzError, SenderProfile};
use taskbot_shared::commands::{
    end_of_day, parse_all_tasks, parse_allow_user, parse_comment, parse_comments,
    parse_create_task, parse_due_date, parse_history, parse_input, parse_my_tasks,
    parse_priority, parse_set_role, parse_settings, parse_task_details, parse_update_status,
    validate_title, Command, CreateTaskArgs, Input, ParseError, SettingsArgs,
};
use taskbot_shared::format::task_card;
use taskbot_shared::models::task::TaskPriority;
use taskbot_shared::models::user::User;
use taskbot_shared::store::Store;
use taskbot_shared::tasks::{CreatedTask, TaskOpError, TaskService};
use taskbot_shared::transport::{InlineButton, OutgoingMessage};
use tracing::{debug, error, info, warn};

use crate::config::BotConfig;
use session::{Session, SessionStore, WizardStep};

/// A text message (or button press) from a chat user
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Chat to reply to
    pub chat_id: String,

    /// Who sent it
    pub sender: SenderProfile,

    /// Message text
    pub text: String,
}

/// Reply to the sender
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub button: Option<InlineButton>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            button: None,
        }
    }

    pub fn with_button(mut self, button: InlineButton) -> Self {
        self.button = Some(button);
        self
    }
}

/// Everything produced by one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub reply: Reply,

    /// Messages for other users (assignee or creator of a task)
    pub notifications: Vec<OutgoingMessage>,
}

impl From<Reply> for Dispatch {
    fn from(reply: Reply) -> Self {
        Self {
            reply,
            notifications: Vec::new(),
        }
    }
}

impl Dispatch {
    fn notify(mut self, message: OutgoingMessage) -> Self {
        self.notifications.push(message);
        self
    }
}

/// Routes messages to task operations
pub struct Dispatcher {
    service: TaskService,
    sessions: SessionStore,
    access_mode: AccessMode,
}

impl Dispatcher {
    pub fn new(service: TaskService, config: &BotConfig) -> Self {
        Self {
            service,
            sessions: SessionStore::new(config.session_ttl()),
            access_mode: config.access_mode,
        }
    }

    pub fn access_mode(&self) -> AccessMode {
        self.access_mode
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Handles a message using the current time
    pub async fn dispatch(&self, message: &IncomingMessage) -> Dispatch {
        self.dispatch_at(message, Utc::now(), Instant::now()).await
    }

    /// Handles a message at a given wall-clock and monotonic time
    pub async fn dispatch_at(
        &self,
        message: &IncomingMessage,
        now: DateTime<Utc>,
        clock: Instant,
    ) -> Dispatch {
        let purged = self.sessions.purge_expired(clock);
        if purged > 0 {
            debug!(purged, "Expired wizard sessions dropped");
        }

        let input = parse_input(&message.text);
        let registering = matches!(
            input,
            Input::Command {
                command: Command::Start,
                ..
            }
        );

        let outcome = match resolve_sender(
            self.service.store().as_ref(),
            self.access_mode,
            &message.sender,
            registering,
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, sender = %message.sender.external_id, "Failed to resolve sender");
                return Reply::text(replies::APOLOGY).into();
            }
        };

        let user = match outcome {
            AccessOutcome::Granted(user) => user,
            AccessOutcome::NotRegistered => return Reply::text(replies::NOT_REGISTERED).into(),
            AccessOutcome::NotAuthorized => return Reply::text(replies::NOT_AUTHORIZED).into(),
        };

        match input {
            Input::Command { command, args } => {
                let had_session = self.sessions.cancel(&user.external_id, clock);

                if command.admin_only() && !user.is_admin() {
                    warn!(user_id = user.id, command = %command, "Administrator command denied");
                    return Reply::text(replies::DENIED).into();
                }

                debug!(user_id = user.id, command = %command, "Dispatching command");
                self.run_command(&user, command, args, had_session, now, clock)
                    .await
            }
            Input::UnknownCommand(token) => {
                self.sessions.cancel(&user.external_id, clock);
                debug!(user_id = user.id, token = %token, "Unknown command");
                Reply::text(replies::UNKNOWN_COMMAND).into()
            }
            Input::Text(text) => match self.sessions.take(&user.external_id, clock) {
                Some(session) => self.wizard_step(&user, session, text, now, clock).await,
                None => Reply::text(replies::UNKNOWN_COMMAND).into(),
            },
        }
    }

    async fn run_command(
        &self,
        user: &User,
        command: Command,
        args: &str,
        had_session: bool,
        now: DateTime<Utc>,
        clock: Instant,
    ) -> Dispatch {
        match command {
            Command::Start => Reply::text(replies::welcome(user)).into(),
            Command::Help => Reply::text(replies::help(user.role)).into(),
            Command::Cancel => {
                if had_session {
                    Reply::text(replies::WIZARD_CANCELLED).into()
                } else {
                    Reply::text(replies::NOTHING_TO_CANCEL).into()
                }
            }
            Command::CreateTask if args.is_empty() => {
                let session = self.sessions.start(&user.external_id, clock);
                info!(user_id = user.id, "Create-task wizard started");
                Reply::text(replies::wizard_prompt(session.step)).into()
            }
            Command::CreateTask => match parse_create_task(args, now) {
                Ok(parsed) => self.create_task(user, parsed).await,
                Err(e) => error_reply(user, e.into()),
            },
            Command::MyTasks => {
                let result = match parse_my_tasks(args) {
                    Ok(status) => self.service.list_my_tasks(user, status).await,
                    Err(e) => Err(e.into()),
                };
                match result {
                    Ok(tasks) if tasks.is_empty() => Reply::text(replies::NO_TASKS_MINE).into(),
                    Ok(tasks) => Reply::text(replies::task_list("📋 Your tasks", &tasks)).into(),
                    Err(e) => error_reply(user, e),
                }
            }
            Command::AllTasks => {
                let result = match parse_all_tasks(args) {
                    Ok(filter) => self.service.list_all_tasks(user, &filter).await,
                    Err(e) => Err(e.into()),
                };
                match result {
                    Ok(tasks) if tasks.is_empty() => Reply::text(replies::NO_TASKS_ALL).into(),
                    Ok(tasks) => Reply::text(replies::task_list("📋 All tasks", &tasks)).into(),
                    Err(e) => error_reply(user, e),
                }
            }
            Command::TaskDetails => {
                let result = match parse_task_details(args) {
                    Ok(task_id) => self.service.task_details(user, task_id).await,
                    Err(e) => Err(e.into()),
                };
                match result {
                    Ok(details) => {
                        let assignee = name_or_unknown(details.assignee.as_ref());
                        let creator = name_or_unknown(details.creator.as_ref());
                        Reply::text(task_card(&details.task, &assignee, &creator)).into()
                    }
                    Err(e) => error_reply(user, e),
                }
            }
            Command::UpdateStatus => self.update_status(user, args, now).await,
            Command::History => {
                let result = match parse_history(args) {
                    Ok(task_id) => self.service.task_history(user, task_id).await,
                    Err(e) => Err(e.into()),
                };
                match result {
                    Ok(history) => Reply::text(replies::history(&history))
                        .with_button(InlineButton::open_task(history.task.id))
                        .into(),
                    Err(e) => error_reply(user, e),
                }
            }
            Command::Comments => {
                let result = match parse_comments(args) {
                    Ok(task_id) => self.service.list_comments(user, task_id).await,
                    Err(e) => Err(e.into()),
                };
                match result {
                    Ok(comments) => Reply::text(replies::comments(&comments)).into(),
                    Err(e) => error_reply(user, e),
                }
            }
            Command::Comment => self.add_comment(user, args, now).await,
            Command::Settings => {
                let result = match parse_settings(args) {
                    Ok(parsed) => self
                        .service
                        .update_settings(user, parsed, now)
                        .await
                        .map(|settings| (parsed, settings)),
                    Err(e) => Err(e.into()),
                };
                match result {
                    Ok((SettingsArgs::Show, settings)) => {
                        Reply::text(replies::settings(&settings)).into()
                    }
                    Ok((_, settings)) => Reply::text(format!(
                        "{}\n\n{}",
                        replies::SETTINGS_SAVED,
                        replies::settings(&settings)
                    ))
                    .into(),
                    Err(e) => error_reply(user, e),
                }
            }
            Command::SetRole => {
                let result = match parse_set_role(args) {
                    Ok(parsed) => self.service.change_role(user, parsed).await,
                    Err(e) => Err(e.into()),
                };
                match result {
                    Ok(updated) => Reply::text(replies::role_changed(&updated)).into(),
                    Err(e) => error_reply(user, e),
                }
            }
            Command::AllowUser => {
                let result = match parse_allow_user(args) {
                    Ok(parsed) => self.service.allow_user(user, parsed).await,
                    Err(e) => Err(e.into()),
                };
                match result {
                    Ok(entry) => Reply::text(replies::user_allowed(&entry.handle, entry.role)).into(),
                    Err(e) => error_reply(user, e),
                }
            }
        }
    }

    async fn create_task(&self, creator: &User, args: CreateTaskArgs) -> Dispatch {
        match self.service.create_task(creator, args).await {
            Ok(created) => created_reply(creator, created),
            Err(e) => error_reply(creator, e),
        }
    }

    async fn update_status(&self, user: &User, args: &str, now: DateTime<Utc>) -> Dispatch {
        let result = match parse_update_status(args) {
            Ok(parsed) => self.service.update_status(user, parsed, now).await,
            Err(e) => Err(e.into()),
        };

        let change = match result {
            Ok(change) => change,
            Err(e) => return error_reply(user, e),
        };

        if !change.changed() {
            return Reply::text(replies::status_unchanged(&change.task)).into();
        }

        let dispatch: Dispatch =
            Reply::text(replies::status_changed(&change.task, change.previous)).into();
        if change.task.creator_id == user.id {
            return dispatch;
        }

        match self.service.store().find_user(change.task.creator_id).await {
            Ok(Some(creator)) => dispatch.notify(
                OutgoingMessage::new(
                    creator.external_id,
                    replies::status_changed_by(&change.task, change.previous, user),
                )
                .with_button(InlineButton::open_task(change.task.id)),
            ),
            Ok(None) => dispatch,
            Err(e) => {
                warn!(error = %e, task_id = change.task.id, "Could not load creator for notification");
                dispatch
            }
        }
    }

    /// Stores a comment and notifies the users it mentions
    async fn add_comment(&self, user: &User, args: &str, now: DateTime<Utc>) -> Dispatch {
        let result = match parse_comment(args) {
            Ok(parsed) => self.service.add_comment(user, parsed, now).await,
            Err(e) => Err(e.into()),
        };

        let posted = match result {
            Ok(posted) => posted,
            Err(e) => return error_reply(user, e),
        };

        let button = InlineButton::open_task(posted.task.id);
        let text = replies::mentioned(&posted, user);
        let mut dispatch: Dispatch = Reply::text(replies::comment_added(&posted)).into();
        for mentioned in &posted.notify {
            dispatch = dispatch.notify(
                OutgoingMessage::new(mentioned.external_id.clone(), text.clone())
                    .with_button(button.clone()),
            );
        }
        dispatch
    }

    /// Applies one line of input to a wizard session
    ///
    /// Invalid input re-prompts the same step and keeps the session.
    async fn wizard_step(
        &self,
        user: &User,
        mut session: Session,
        text: &str,
        now: DateTime<Utc>,
        clock: Instant,
    ) -> Dispatch {
        if !user.is_admin() {
            warn!(user_id = user.id, "Wizard session dropped for non-administrator");
            return Reply::text(replies::DENIED).into();
        }

        let skip = text == "-";
        let next = match session.step {
            WizardStep::Title => validate_title(text).map(|title| {
                session.draft.title = title;
                WizardStep::Description
            }),
            WizardStep::Description => {
                session.draft.description = if skip { String::new() } else { text.to_string() };
                Ok(WizardStep::Priority)
            }
            WizardStep::Priority => {
                let priority = if skip {
                    Ok(TaskPriority::default())
                } else {
                    parse_priority(text)
                };
                priority.map(|priority| {
                    session.draft.priority = priority;
                    WizardStep::DueDate
                })
            }
            WizardStep::DueDate => {
                let due = if skip {
                    Ok(end_of_day(now))
                } else {
                    parse_due_date(text)
                };
                due.map(|due| {
                    session.draft.due_date = Some(due);
                    WizardStep::Assignee
                })
            }
            WizardStep::Assignee => return self.finish_wizard(user, session, text, now, clock).await,
        };

        match next {
            Ok(step) => {
                session.step = step;
                self.sessions.put(&user.external_id, session, clock);
                Reply::text(replies::wizard_prompt(step)).into()
            }
            Err(e) => self.reprompt(user, session, replies::validation(&e.to_string()), clock),
        }
    }

    async fn finish_wizard(
        &self,
        user: &User,
        session: Session,
        text: &str,
        now: DateTime<Utc>,
        clock: Instant,
    ) -> Dispatch {
        let assignee = match text.to_lowercase().as_str() {
            "-" | "me" => None,
            _ => Some(text.to_string()),
        };

        let draft = session.draft.clone();
        info!(user_id = user.id, title = %draft.title, "Create-task wizard finished");
        let args = CreateTaskArgs {
            title: draft.title,
            description: draft.description,
            priority: draft.priority,
            due_date: draft.due_date.unwrap_or_else(|| end_of_day(now)),
            assignee,
        };

        match self.service.create_task(user, args).await {
            Ok(created) => created_reply(user, created),
            Err(TaskOpError::Validation(e @ ParseError::InvalidAssignee(_))) => {
                self.reprompt(user, session, replies::validation(&e.to_string()), clock)
            }
            Err(TaskOpError::AssigneeNotFound(id)) => {
                self.reprompt(user, session, replies::assignee_not_found(&id), clock)
            }
            Err(e) => error_reply(user, e),
        }
    }

    fn reprompt(&self, user: &User, session: Session, problem: String, clock: Instant) -> Dispatch {
        let step = session.step;
        self.sessions.put(&user.external_id, session, clock);
        Reply::text(format!("{}\n\n{}", problem, replies::wizard_prompt(step))).into()
    }
}

/// Confirmation for the creator, plus a notice for a different assignee
fn created_reply(creator: &User, created: CreatedTask) -> Dispatch {
    let button = InlineButton::open_task(created.task.id);
    let dispatch: Dispatch = Reply::text(replies::task_created(&created))
        .with_button(button.clone())
        .into();

    if created.assignee.id == creator.id {
        return dispatch;
    }
    dispatch.notify(
        OutgoingMessage::new(
            created.assignee.external_id.clone(),
            replies::task_assigned(&created.task, creator),
        )
        .with_button(button),
    )
}

fn name_or_unknown(user: Option<&User>) -> String {
    user.map(User::display_name)
        .unwrap_or_else(|| "unknown".to_string())
}

/// Renders a failed operation as a reply
fn error_reply(user: &User, e: TaskOpError) -> Dispatch {
    let text = match &e {
        TaskOpError::Validation(parse) => replies::validation(&parse.to_string()),
        TaskOpError::Forbidden(AuthzError::AdminRequired) => replies::DENIED.to_string(),
        TaskOpError::Forbidden(AuthzError::NotAssignee { task_id }) => {
            warn!(user_id = user.id, task_id, "Task access denied");
            replies::TASK_FORBIDDEN.to_string()
        }
        TaskOpError::TaskNotFound => replies::TASK_NOT_FOUND.to_string(),
        TaskOpError::UserNotFound(id) => replies::user_not_found(id),
        TaskOpError::AssigneeNotFound(id) => replies::assignee_not_found(id),
        TaskOpError::Store(store) => {
            error!(error = %store, user_id = user.id, "Task operation failed");
            replies::APOLOGY.to_string()
        }
    };
    Reply::text(text).into()
}
