//! Remote operations on primitives and account settings
//!
//! Each operation is one or two exchanges through [`StarexecClient::issue`].
//! Failures the service explains through a JSON message or the status message
//! cookie surface as [`ProtocolError::Rejected`].

use serde_json::Value;

use crate::app::client::http::{OutgoingRequest, RawResponse};
use crate::app::client::StarexecClient;
use crate::app::models::{Permissions, Primitive, PrimitiveKind, Traversal};
use crate::app::scraper;
use crate::constants::{cookies, service};
use crate::errors::{AppError, ProtocolError, Result, TransportError};

/// Whose primitives a listing shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingOwner {
    Space(u64),
    /// Primitives owned by the logged-in user
    CurrentUser,
}

/// Parameters of a new job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub space: u64,
    pub queue: u64,
    pub name: String,
    pub description: String,
    pub post_processor: Option<u64>,
    /// Falls back to the defaults shown on the job creation page
    pub wallclock_timeout: Option<u64>,
    pub cpu_timeout: Option<u64>,
    pub traversal: Traversal,
}

/// Parameters of a new subspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubspaceSpec {
    pub parent: u64,
    pub name: String,
    pub description: String,
    pub locked: bool,
    pub permissions: Permissions,
}

/// A copy or link of primitives into another space
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub kind: PrimitiveKind,
    pub ids: Vec<u64>,
    pub from: Option<u64>,
    pub to: u64,
    /// Copy when set, link otherwise
    pub copy: bool,
    pub hierarchy: bool,
}

/// Account settings editable through `set*` commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSetting {
    FirstName,
    LastName,
    Institution,
    ArchiveType,
}

impl UserSetting {
    pub fn from_command_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "firstname" => Some(Self::FirstName),
            "lastname" => Some(Self::LastName),
            "institution" => Some(Self::Institution),
            "archivetype" => Some(Self::ArchiveType),
            _ => None,
        }
    }

    pub fn field_name(self) -> &'static str {
        match self {
            Self::FirstName => "firstname",
            Self::LastName => "lastname",
            Self::Institution => "institution",
            Self::ArchiveType => "archivetype",
        }
    }
}

/// Error built from the status message cookie of a refused request
pub(crate) fn rejection(response: &RawResponse) -> ProtocolError {
    let message = scraper::extract_cookie(&response.headers, cookies::STATUS_MESSAGE)
        .map(|raw| raw.trim().trim_matches('"').to_string())
        .unwrap_or_default();
    if !message.is_empty() {
        tracing::warn!("Service refused the request: {}", message);
    }
    ProtocolError::Rejected { message }
}

/// The single id reported in the `New_ID` cookie
pub(crate) fn new_id(response: &RawResponse) -> Result<u64> {
    match scraper::extract_cookie_number(&response.headers, cookies::NEW_ID) {
        Ok(Some(id)) if id > 0 => Ok(id),
        _ => Err(rejection(response).into()),
    }
}

/// All ids reported in a comma-separated `New_ID` cookie
pub(crate) fn new_ids(response: &RawResponse) -> Result<Vec<u64>> {
    scraper::extract_cookie_list(&response.headers, cookies::NEW_ID)
        .into_iter()
        .map(|raw| {
            raw.parse::<u64>().map_err(|_| {
                AppError::from(ProtocolError::MalformedValue {
                    name: cookies::NEW_ID.to_string(),
                    value: raw,
                })
            })
        })
        .collect()
}

fn join_ids(ids: &[u64]) -> Vec<(&'static str, String)> {
    ids.iter().map(|id| ("selectedIds[]", id.to_string())).collect()
}

impl StarexecClient {
    /// Id of the logged-in user
    pub async fn user_id(&mut self) -> Result<u64> {
        let url = self.session().endpoint(service::USER_ID)?;
        let response = self.issue(OutgoingRequest::get(url)).await?;
        let json: Value = serde_json::from_slice(&response.body).map_err(ProtocolError::from)?;
        json.as_u64().ok_or_else(|| {
            AppError::from(ProtocolError::UnexpectedPayload {
                reason: format!("user id reply was {json}"),
            })
        })
    }

    /// List primitives of one kind, in the order the service returns them
    pub async fn list_primitives(
        &mut self,
        kind: PrimitiveKind,
        owner: ListingOwner,
        limit: Option<u64>,
    ) -> Result<Vec<Primitive>> {
        let listing = kind.listing_name().ok_or_else(|| ProtocolError::UnexpectedPayload {
            reason: format!("{kind} cannot be listed"),
        })?;
        let path = match owner {
            ListingOwner::Space(space) => {
                format!("{}{}/{}/pagination", service::SPACE_LISTING, space, listing)
            }
            ListingOwner::CurrentUser => {
                let user = self.user_id().await?;
                format!("{}{}/{}/pagination", service::USER_LISTING, user, listing)
            }
        };
        let display_length = limit.map_or_else(|| i32::MAX.to_string(), |l| l.to_string());
        let columns = kind.listing_columns().to_string();

        let request = OutgoingRequest::post(self.session().endpoint(&path)?).with_form([
            ("sEcho", "1"),
            ("iColumns", columns.as_str()),
            ("sColumns", ""),
            ("iDisplayStart", "0"),
            ("iDisplayLength", display_length.as_str()),
            ("iSortCol_0", "0"),
            ("sSearch", ""),
            ("sSortDir_0", "asc"),
        ]);
        let response = self.issue(request).await?;
        let primitives = scraper::parse_listing(&response.text(), kind.is_container())?;
        tracing::debug!("Listed {} {}", primitives.len(), kind);
        Ok(primitives)
    }

    /// Create a job in a space; returns the new job's id
    pub async fn create_job(&mut self, spec: &JobSpec) -> Result<u64> {
        let (wallclock, cpu) = match (spec.wallclock_timeout, spec.cpu_timeout) {
            (Some(wallclock), Some(cpu)) => (wallclock.to_string(), cpu.to_string()),
            (wallclock, cpu) => {
                let mut page_url = self.session().endpoint(service::ADD_JOB_PAGE)?;
                page_url
                    .query_pairs_mut()
                    .append_pair("sid", &spec.space.to_string());
                let page = self.issue(OutgoingRequest::get(page_url)).await?.text();
                let default_of = |name: &str| {
                    scraper::extract_input_value(&page, name).unwrap_or_default()
                };
                (
                    wallclock.map_or_else(|| default_of("wallclockTimeout"), |v| v.to_string()),
                    cpu.map_or_else(|| default_of("cpuTimeout"), |v| v.to_string()),
                )
            }
        };

        let space = spec.space.to_string();
        let queue = spec.queue.to_string();
        let post_process = spec
            .post_processor
            .map_or_else(|| "-1".to_string(), |id| id.to_string());
        let request = OutgoingRequest::post(self.session().endpoint(service::ADD_JOB)?)
            .with_form([
                ("sid", space.as_str()),
                ("name", spec.name.as_str()),
                ("desc", spec.description.as_str()),
                ("wallclockTimeout", wallclock.as_str()),
                ("cpuTimeout", cpu.as_str()),
                ("queue", queue.as_str()),
                ("postProcess", post_process.as_str()),
                ("preProcess", "-1"),
                ("seed", "0"),
                ("resultsInterval", "0"),
                ("traversal", spec.traversal.form_value()),
                ("runChoice", "keepHierarchy"),
                ("pause", "no"),
                ("suppressTimestamp", "no"),
            ])
            .without_redirects();
        let response = self.issue(request).await?;
        let id = new_id(&response)?;
        tracing::info!("Created job {} in space {}", id, spec.space);
        Ok(id)
    }

    /// Create a subspace; the service redirects to the new space on success
    pub async fn create_subspace(&mut self, spec: &SubspaceSpec) -> Result<u64> {
        let mut form = vec![
            ("parent", spec.parent.to_string()),
            ("name", spec.name.clone()),
            ("desc", spec.description.clone()),
            ("locked", spec.locked.to_string()),
        ];
        form.extend(
            spec.permissions
                .fields()
                .filter(|(_, granted)| *granted)
                .map(|(field, _)| (field, "on".to_string())),
        );

        let request = OutgoingRequest::post(self.session().endpoint(service::ADD_SPACE)?)
            .with_form(form)
            .without_redirects();
        let response = self.issue(request).await?;
        if response.status != 302 {
            return Err(ProtocolError::BadParentSpace.into());
        }
        let id = new_id(&response)?;
        tracing::info!("Created space {} under {}", id, spec.parent);
        Ok(id)
    }

    /// Copy or link primitives into a space; returns the ids of any copies
    pub async fn transfer(&mut self, transfer: &TransferRequest) -> Result<Vec<u64>> {
        let path = match transfer.kind {
            PrimitiveKind::Space => format!("{}{}/copySpace", service::SPACES, transfer.to),
            kind => format!("{}{}/add/{}", service::SPACES, transfer.to, kind.service_name()),
        };
        let hierarchy = transfer.hierarchy.to_string();

        let mut form = vec![("copyToSubspaces", hierarchy.clone())];
        if let Some(from) = transfer.from {
            form.push(("fromSpace", from.to_string()));
        }
        form.extend(join_ids(&transfer.ids));
        form.push(("copy", transfer.copy.to_string()));
        form.push(("copyHierarchy", hierarchy));
        form.push((
            "copyPrimitives",
            if transfer.copy { "COPY" } else { "LINK" }.to_string(),
        ));

        let request = OutgoingRequest::post(self.session().endpoint(&path)?).with_form(form);
        let response = self.issue(request).await?;
        scraper::parse_reply(&response.text())?;
        new_ids(&response)
    }

    /// Remove primitives from a space without deleting them.
    ///
    /// Subspaces are removed from their parent; `recycle` then also moves
    /// their primitives to the recycle bin.
    pub async fn remove(
        &mut self,
        kind: PrimitiveKind,
        ids: &[u64],
        space: Option<u64>,
        recycle: bool,
    ) -> Result<()> {
        let path = match (kind, space) {
            (PrimitiveKind::Space, _) | (_, None) => {
                format!("{}{}", service::REMOVE, kind.service_name())
            }
            (_, Some(space)) => {
                format!("{}{}/{}", service::REMOVE, kind.service_name(), space)
            }
        };
        let mut form = join_ids(ids);
        form.push(("recyclePrims", recycle.to_string()));

        let request = OutgoingRequest::post(self.session().endpoint(&path)?).with_form(form);
        let response = self.issue(request).await?;
        scraper::parse_reply(&response.text())?;
        tracing::info!("Removed {} {:?}", kind, ids);
        Ok(())
    }

    /// Delete primitives permanently
    pub async fn delete(&mut self, kind: PrimitiveKind, ids: &[u64]) -> Result<()> {
        let path = format!("{}{}", service::DELETE, kind.service_name());
        let request =
            OutgoingRequest::post(self.session().endpoint(&path)?).with_form(join_ids(ids));
        let response = self.issue(request).await?;
        scraper::parse_reply(&response.text())?;
        tracing::info!("Deleted {} {:?}", kind, ids);
        Ok(())
    }

    /// Change one field of the logged-in user's profile
    pub async fn set_user_setting(&mut self, setting: UserSetting, value: &str) -> Result<()> {
        let user = self.user_id().await?;
        let value = match setting {
            // The service wants the bare extension
            UserSetting::ArchiveType => value.trim().trim_start_matches('.'),
            _ => value.trim(),
        };
        let path = format!("{}{}/{}", service::EDIT_USER, setting.field_name(), user);
        let mut url = self.session().endpoint(&path)?;
        url.path_segments_mut()
            .map_err(|()| TransportError::InvalidAddress {
                url: path.clone(),
                reason: "Address cannot carry path segments".to_string(),
            })?
            .push(value);
        let response = self.issue(OutgoingRequest::post(url)).await?;
        scraper::parse_reply(&response.text())?;
        Ok(())
    }

    /// Make a space public or private, optionally with all its subspaces
    pub async fn set_space_visibility(
        &mut self,
        space: u64,
        hierarchy: bool,
        public: bool,
    ) -> Result<()> {
        let path = format!(
            "{}{}/{}/{}",
            service::CHANGE_VISIBILITY,
            space,
            hierarchy,
            public
        );
        let response = self
            .issue(OutgoingRequest::post(self.session().endpoint(&path)?))
            .await?;
        if response.status != 200 {
            return Err(ProtocolError::BadParentSpace.into());
        }
        Ok(())
    }

    /// Pause a running job or resume a paused one
    pub async fn pause_or_resume(&mut self, job: u64, pause: bool) -> Result<()> {
        let method = if pause { "pause" } else { "resume" };
        let path = format!("{}{}/job/{}", service::JOB_CONTROL, method, job);
        let request =
            OutgoingRequest::post(self.session().endpoint(&path)?).with_form(Vec::<(&str, &str)>::new());
        let response = self.issue(request).await?;
        scraper::parse_reply(&response.text())?;
        tracing::info!("Job {} {}d", job, method);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_ids_parses_list() {
        let response = RawResponse::new(200).with_header("Set-Cookie", "New_ID=\"4,5, 6\"; Path=/");
        assert_eq!(new_ids(&response).unwrap(), vec![4, 5, 6]);
        assert!(new_ids(&RawResponse::new(200)).unwrap().is_empty());
    }

    #[test]
    fn test_new_id_requires_positive_cookie() {
        // Test that a missing or zero id is reported with the service's message
        let response = RawResponse::new(200)
            .with_header("Set-Cookie", "STATUS_MESSAGE_STRING=\"quota exceeded\"");
        match new_id(&response) {
            Err(AppError::Protocol(ProtocolError::Rejected { message })) => {
                assert_eq!(message, "quota exceeded")
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let zero = RawResponse::new(302).with_header("Set-Cookie", "New_ID=0");
        assert!(new_id(&zero).is_err());

        let ok = RawResponse::new(302).with_header("Set-Cookie", "New_ID=31");
        assert_eq!(new_id(&ok).unwrap(), 31);
    }

    #[test]
    fn test_user_setting_names() {
        assert_eq!(
            UserSetting::from_command_suffix("institution"),
            Some(UserSetting::Institution)
        );
        assert_eq!(UserSetting::from_command_suffix("email"), None);
        assert_eq!(UserSetting::ArchiveType.field_name(), "archivetype");
    }
}
