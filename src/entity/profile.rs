//! # User profile derived during entity initialization.
//!
//! [`UserProfile::fetch`] queries the [`ApiClient`] for the current user, its teams
//! and, per team, its channels. Team and channel choices are uniform (weight 1)
//! and always have exactly one entry per membership.

use async_trait::async_trait;
use rand::Rng;

use crate::choice::{Choice, pick};
use crate::error::{ApiError, SelectionError};

/// Current user as returned by the API.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct User {
    /// Server-assigned user id.
    pub id: String,
    /// Login name.
    pub username: String,
    /// Contact address.
    pub email: String,
    /// Authentication backend, empty for password login.
    pub auth_service: String,
    /// Backend-specific auth identifier.
    pub auth_data: Option<String>,
    /// Password used to log in.
    pub password: String,
    /// Display nickname.
    pub nickname: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Job title.
    pub position: String,
    /// Space-separated role names.
    pub roles: String,
    /// Preferred locale.
    pub locale: String,
}

/// Team as returned by the API.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Team {
    /// Server-assigned team id.
    pub id: String,
    /// Team handle.
    pub name: String,
}

/// Channel as returned by the API.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Channel {
    /// Server-assigned channel id.
    pub id: String,
    /// Channel handle.
    pub name: String,
}

/// # Remote API client used to build the profile.
///
/// Both [`ApiError`] variants abort initialization.
#[async_trait]
pub trait ApiClient: Send + Sync + 'static {
    /// Fetches the authenticated user.
    async fn current_user(&self) -> Result<User, ApiError>;

    /// Fetches the teams `user_id` belongs to.
    async fn teams_for_user(&self, user_id: &str) -> Result<Vec<Team>, ApiError>;

    /// Fetches the channels of `team_id` that `user_id` belongs to.
    async fn channels_for_team(&self, team_id: &str, user_id: &str)
    -> Result<Vec<Channel>, ApiError>;
}

/// One channel membership.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelMembership {
    /// Channel id.
    pub id: String,
    /// Channel handle.
    pub name: String,
}

/// One team membership with its channels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TeamMembership {
    /// Team id.
    pub id: String,
    /// Team handle.
    pub name: String,
    /// Channels of this team the user belongs to.
    pub channels: Vec<ChannelMembership>,
    channel_choice: Vec<Choice<usize>>,
}

impl TeamMembership {
    fn new(team: Team, channels: Vec<Channel>) -> Self {
        let channels: Vec<ChannelMembership> = channels
            .into_iter()
            .map(|c| ChannelMembership {
                id: c.id,
                name: c.name,
            })
            .collect();
        let channel_choice = (0..channels.len()).map(|i| Choice::new(i, 1)).collect();
        Self {
            id: team.id,
            name: team.name,
            channels,
            channel_choice,
        }
    }

    /// Draws one channel; fails with [`SelectionError::Empty`] for a team without channels.
    pub fn random_channel<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<&ChannelMembership, SelectionError> {
        let idx = pick(&self.channel_choice, rng)?;
        Ok(&self.channels[*idx])
    }
}

/// Profile of the simulated user; immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserProfile {
    /// Id of the simulated user.
    pub user_id: String,
    /// Login name.
    pub username: String,
    /// Contact address.
    pub email: String,
    /// Authentication backend, empty for password login.
    pub auth_service: String,
    /// Backend-specific auth identifier, empty when absent.
    pub auth_data: String,
    /// Password used to log in.
    pub password: String,
    /// Display nickname.
    pub nickname: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Job title.
    pub position: String,
    /// Space-separated role names.
    pub roles: String,
    /// Preferred locale.
    pub locale: String,
    /// Team memberships, each with its channels.
    pub teams: Vec<TeamMembership>,
    team_choice: Vec<Choice<usize>>,
}

impl UserProfile {
    /// Builds the profile from the API: user → teams → channels per team.
    ///
    /// The first failing request aborts the build.
    pub async fn fetch(client: &dyn ApiClient) -> Result<Self, ApiError> {
        let user = client.current_user().await?;
        let teams = client.teams_for_user(&user.id).await?;

        let mut memberships = Vec::with_capacity(teams.len());
        for team in teams {
            let channels = client.channels_for_team(&team.id, &user.id).await?;
            memberships.push(TeamMembership::new(team, channels));
        }

        Ok(Self::from_parts(user, memberships))
    }

    fn from_parts(user: User, teams: Vec<TeamMembership>) -> Self {
        let team_choice = (0..teams.len()).map(|i| Choice::new(i, 1)).collect();
        Self {
            user_id: user.id,
            username: user.username,
            email: user.email,
            auth_service: user.auth_service,
            auth_data: user.auth_data.unwrap_or_default(),
            password: user.password,
            nickname: user.nickname,
            first_name: user.first_name,
            last_name: user.last_name,
            position: user.position,
            roles: user.roles,
            locale: user.locale,
            teams,
            team_choice,
        }
    }

    /// Draws one team; fails with [`SelectionError::Empty`] when the user has no teams.
    pub fn random_team<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<&TeamMembership, SelectionError> {
        let idx = pick(&self.team_choice, rng)?;
        Ok(&self.teams[*idx])
    }

    /// Draws a team and then one of its channels.
    pub fn random_channel<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<(&TeamMembership, &ChannelMembership), SelectionError> {
        let team = self.random_team(rng)?;
        let channel = team.random_channel(rng)?;
        Ok((team, channel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};
    use std::collections::HashMap;

    struct FakeApi {
        teams: Vec<Team>,
        channels: HashMap<String, Vec<Channel>>,
        fail_channels_for: Option<String>,
    }

    #[async_trait]
    impl ApiClient for FakeApi {
        async fn current_user(&self) -> Result<User, ApiError> {
            Ok(User {
                id: "u1".into(),
                username: "loadtest-1".into(),
                locale: "en".into(),
                auth_data: None,
                ..User::default()
            })
        }

        async fn teams_for_user(&self, _user_id: &str) -> Result<Vec<Team>, ApiError> {
            Ok(self.teams.clone())
        }

        async fn channels_for_team(
            &self,
            team_id: &str,
            _user_id: &str,
        ) -> Result<Vec<Channel>, ApiError> {
            if self.fail_channels_for.as_deref() == Some(team_id) {
                return Err(ApiError::Transport {
                    message: "reset".into(),
                });
            }
            Ok(self.channels.get(team_id).cloned().unwrap_or_default())
        }
    }

    fn team(id: &str) -> Team {
        Team {
            id: id.into(),
            name: format!("team-{id}"),
        }
    }

    fn channel(id: &str) -> Channel {
        Channel {
            id: id.into(),
            name: format!("chan-{id}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_builds_memberships() {
        let api = FakeApi {
            teams: vec![team("t1"), team("t2")],
            channels: HashMap::from([
                ("t1".to_string(), vec![channel("c1"), channel("c2")]),
                ("t2".to_string(), vec![channel("c3")]),
            ]),
            fail_channels_for: None,
        };

        let profile = UserProfile::fetch(&api).await.unwrap();
        assert_eq!(profile.username, "loadtest-1");
        assert_eq!(profile.auth_data, "");
        assert_eq!(profile.teams.len(), 2);
        assert_eq!(profile.team_choice.len(), profile.teams.len());
        for t in &profile.teams {
            assert_eq!(t.channel_choice.len(), t.channels.len());
        }

        let mut rng = StdRng::seed_from_u64(1);
        let (t, c) = profile.random_channel(&mut rng).unwrap();
        assert!(t.channels.contains(c));
    }

    #[tokio::test]
    async fn test_fetch_aborts_on_channel_error() {
        let api = FakeApi {
            teams: vec![team("t1"), team("t2")],
            channels: HashMap::new(),
            fail_channels_for: Some("t2".into()),
        };
        let err = UserProfile::fetch(&api).await.unwrap_err();
        assert_eq!(err.as_label(), "api_transport");
    }

    #[tokio::test]
    async fn test_empty_memberships_fail_explicitly() {
        let api = FakeApi {
            teams: vec![team("lonely")],
            channels: HashMap::new(),
            fail_channels_for: None,
        };
        let profile = UserProfile::fetch(&api).await.unwrap();
        let mut rng = StdRng::seed_from_u64(1);

        assert_eq!(
            profile.random_channel(&mut rng).unwrap_err(),
            SelectionError::Empty
        );

        let no_teams = UserProfile::from_parts(User::default(), Vec::new());
        assert_eq!(no_teams.random_team(&mut rng).unwrap_err(), SelectionError::Empty);
    }
}
