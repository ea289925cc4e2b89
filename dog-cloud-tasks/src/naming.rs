use ulid::Ulid;

use crate::{QueueIdentity, TaskName};

/// Longest task id Cloud Tasks accepts
pub const MAX_TASK_ID_LEN: usize = 500;

/// Trailing segment of a namespaced name.
///
/// Both `\` and `::` count as separators, so `App\Jobs\SendEmail` and
/// `app::jobs::SendEmail` both yield `SendEmail`.
pub fn class_basename(name: &str) -> &str {
    let after_backslash = name.rfind('\\').map(|idx| idx + 1);
    let after_colons = name.rfind("::").map(|idx| idx + 2);
    let start = after_backslash.max(after_colons).unwrap_or(0);
    &name[start..]
}

/// Replace characters Cloud Tasks rejects in task ids (`[A-Za-z0-9_-]` only)
fn sanitize(segment: &str) -> String {
    segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Derives unique task names inside one project and location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskNamer {
    project: String,
    location: String,
}

impl TaskNamer {
    pub fn new(project: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            location: location.into(),
        }
    }

    /// `{ulid}-{ClassName}`: sortable by creation time, unique per call
    pub fn task_id(display_name: &str) -> String {
        let basename = sanitize(class_basename(display_name));
        let mut id = if basename.is_empty() {
            Ulid::new().to_string()
        } else {
            format!("{}-{}", Ulid::new(), basename)
        };
        id.truncate(MAX_TASK_ID_LEN);
        id
    }

    /// Fully-qualified name for a new task on `queue`
    pub fn name(&self, queue: &str, display_name: &str) -> TaskName {
        QueueIdentity::new(&self.project, &self.location, queue)
            .task_name(&Self::task_id(display_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn basename_handles_both_separators() {
        assert_eq!(class_basename(r"App\Jobs\SendEmail"), "SendEmail");
        assert_eq!(class_basename("app::jobs::SendEmail"), "SendEmail");
        assert_eq!(class_basename("SendEmail"), "SendEmail");
        assert_eq!(class_basename(r"mixed::App\SendEmail"), "SendEmail");
    }

    #[test]
    fn name_is_fully_qualified() {
        let namer = TaskNamer::new("my-project", "europe-west1");
        let name = namer.name("emails", r"App\Jobs\SendEmail");

        assert!(name
            .as_str()
            .starts_with("projects/my-project/locations/europe-west1/queues/emails/tasks/"));
        assert!(name.task_id().ends_with("-SendEmail"));
        // 26-char ULID prefix
        assert_eq!(name.task_id().len(), 26 + 1 + "SendEmail".len());
    }

    #[test]
    fn forbidden_characters_are_replaced() {
        let id = TaskNamer::task_id("jobs::Resize<Image>");
        assert!(id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));
    }

    #[test]
    fn empty_basename_still_yields_an_id() {
        let id = TaskNamer::task_id("app::");
        assert_eq!(id.len(), 26);
    }

    #[test]
    fn long_names_are_truncated() {
        let id = TaskNamer::task_id(&"X".repeat(1000));
        assert_eq!(id.len(), MAX_TASK_ID_LEN);
    }

    #[test]
    fn ids_sort_by_creation_time() {
        let first = TaskNamer::task_id("Job");
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = TaskNamer::task_id("Job");
        assert!(first < second);
    }

    proptest! {
        #[test]
        fn same_class_never_collides(name in "[A-Za-z][A-Za-z0-9]{0,30}") {
            let namer = TaskNamer::new("p", "l");
            let a = namer.name("q", &name);
            let b = namer.name("q", &name);
            prop_assert_ne!(a, b);
        }
    }
}
