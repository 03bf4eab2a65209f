//! Shared inputs for the codec benchmarks.

#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    group: TestGroup,
    input: TestInput,
}

impl TestCase {
    pub fn new(name: &'static str, group: TestGroup, input: TestInput) -> Self {
        Self { name, group, input }
    }

    pub fn small(name: &'static str, input: TestInput) -> Self {
        Self::new(name, TestGroup::Small, input)
    }

    pub fn large(name: &'static str, input: TestInput) -> Self {
        Self::new(name, TestGroup::Large, input)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    pub fn input(&self) -> &TestInput {
        &self.input
    }
}

/// Raw bytes fed to a benchmark, delivered in `piece_size` slices.
#[derive(Debug, Copy, Clone)]
pub struct TestInput {
    content: &'static [u8],
    piece_size: usize,
}

impl TestInput {
    pub const fn new(content: &'static [u8]) -> Self {
        Self { content, piece_size: content.len() }
    }

    /// Same content, delivered as if the peer wrote `piece_size` bytes at a time.
    pub const fn in_pieces(self, piece_size: usize) -> Self {
        Self { content: self.content, piece_size }
    }

    pub fn content(&self) -> &'static [u8] {
        self.content
    }

    pub fn pieces(&self) -> impl Iterator<Item = &'static [u8]> {
        self.content.chunks(self.piece_size.max(1))
    }
}

#[derive(Clone, Copy, Debug)]
pub enum TestGroup {
    Small,
    Large,
}

pub const GET_SMALL: &[u8] = b"GET /coffee HTTP/1.1\r\nHost: localhost:42069\r\nUser-Agent: curl/8.5.0\r\nAccept: */*\r\n\r\n";

pub const GET_LARGE: &[u8] = b"GET /httpbin/stream/100 HTTP/1.1\r\n\
Host: localhost:42069\r\n\
User-Agent: Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0\r\n\
Accept: text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8\r\n\
Accept-Language: en-US,en;q=0.5\r\n\
Accept-Encoding: gzip, deflate, br, zstd\r\n\
Connection: keep-alive\r\n\
Cookie: session=9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08; theme=dark\r\n\
Upgrade-Insecure-Requests: 1\r\n\
Sec-Fetch-Dest: document\r\n\
Sec-Fetch-Mode: navigate\r\n\
Sec-Fetch-Site: none\r\n\
Sec-Fetch-User: ?1\r\n\
Priority: u=0, i\r\n\
Accept: application/json\r\n\
\r\n";

pub const POST_WITH_BODY: &[u8] = b"POST /submit HTTP/1.1\r\n\
Host: localhost:42069\r\n\
Content-Type: application/json\r\n\
Content-Length: 51\r\n\
\r\n\
{\"name\": \"httpfromtcp\", \"kind\": \"engine\", \"n\": 420}";
